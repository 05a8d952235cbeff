use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// A point the end-effector has to reach within the goal radius.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: usize,
    pub position: Point,
}

impl Target {
    pub fn new(id: usize, position: Point) -> Self {
        Self { id, position }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut x = ryu::Buffer::new();
        let mut y = ryu::Buffer::new();
        let mut z = ryu::Buffer::new();
        write!(
            f,
            "#{} ({},{},{})",
            self.id,
            x.format(self.position.x),
            y.format(self.position.y),
            z.format(self.position.z)
        )
    }
}

pub fn positions(targets: &[Target]) -> Vec<Point> {
    targets.iter().map(|t| t.position).collect()
}
