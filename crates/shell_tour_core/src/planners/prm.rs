use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    time::{Duration, Instant},
};

use kiddo::{KdTree, SquaredEuclidean};
use ordered_float::OrderedFloat;
use rand::{SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

use crate::{
    Configuration, PathSegment, PlanResult, Result, SpaceInformation, Target, Termination,
    geometry::Point,
    optimize::optimize_segment,
    ordering::tsp::tsp_open_end_grouped,
    planners::{MultiGoalPlanner, PlanningContext},
    world::scene::Scene,
};

const DEFAULT_NEIGHBOURS: usize = 10;
/// Uniform draws allowed per requested roadmap node.
const ATTEMPTS_PER_NODE: usize = 10;

/// Undirected roadmap; node ids are insertion order.
struct Roadmap {
    states: Vec<Configuration>,
    edges: Vec<Vec<(usize, f64)>>,
    index: KdTree<f64, 3>,
    neighbours: usize,
}

impl Roadmap {
    fn new(neighbours: usize) -> Self {
        Self {
            states: Vec::new(),
            edges: Vec::new(),
            index: KdTree::new(),
            neighbours,
        }
    }

    fn len(&self) -> usize {
        self.states.len()
    }

    /// Adds `state` and connects it to its nearest existing nodes (by
    /// end-effector position) wherever the straight motion is valid.
    fn insert(&mut self, si: &dyn SpaceInformation, state: Configuration) -> usize {
        let id = self.states.len();
        let here = coords(&si.end_effector(&state));
        let mut links = Vec::new();
        for nn in self
            .index
            .nearest_n::<SquaredEuclidean>(&here, self.neighbours)
        {
            let other = nn.item as usize;
            if si.check_motion(&self.states[other], &state) {
                links.push((other, si.distance(&self.states[other], &state)));
            }
        }
        for &(other, cost) in &links {
            self.edges[other].push((id, cost));
        }
        self.index.add(&here, id as u64);
        self.states.push(state);
        self.edges.push(links);
        id
    }

    /// Dijkstra from `source`: distances and predecessor towards `source`.
    fn shortest_paths(&self, source: usize) -> ShortestPaths {
        let mut dist = vec![f64::INFINITY; self.len()];
        let mut towards = vec![None; self.len()];
        let mut frontier: BinaryHeap<Reverse<(OrderedFloat<f64>, usize)>> = BinaryHeap::new();
        dist[source] = 0.0;
        frontier.push(Reverse((OrderedFloat(0.0), source)));

        while let Some(Reverse((OrderedFloat(cost), node))) = frontier.pop() {
            // stale entry
            if cost > dist[node] {
                continue;
            }
            for &(next, edge) in &self.edges[node] {
                let candidate = cost + edge;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    towards[next] = Some(node);
                    frontier.push(Reverse((OrderedFloat(candidate), next)));
                }
            }
        }
        ShortestPaths { dist, towards }
    }
}

struct ShortestPaths {
    dist: Vec<f64>,
    towards: Vec<Option<usize>>,
}

impl ShortestPaths {
    /// Nodes from `from` to the tree root, inclusive.
    fn walk_from(&self, from: usize) -> Vec<usize> {
        let mut nodes = vec![from];
        let mut current = from;
        while let Some(next) = self.towards[current] {
            nodes.push(next);
            current = next;
        }
        nodes
    }
}

fn coords(point: &Point) -> [f64; 3] {
    [point.x, point.y, point.z]
}

/// Goal sample reachable from the start.
#[derive(Clone, Copy, Debug)]
struct GoalNode {
    node: usize,
    target: usize,
}

/// Multi-goal probabilistic roadmap.
///
/// Builds one roadmap holding the start, `samples_per_goal` goal samples per
/// target and uniform samples, then chooses one sample per reachable target
/// with the grouped open-path ordering over roadmap distances.
pub struct MultiGoalPrm {
    build_time: Duration,
    samples_per_goal: usize,
    roadmap_size: usize,
    neighbours: usize,
    optimize_segments: bool,
    seed: u64,
}

impl MultiGoalPrm {
    pub fn new(
        build_time: Duration,
        samples_per_goal: usize,
        roadmap_size: usize,
        optimize_segments: bool,
        seed: u64,
    ) -> Self {
        Self {
            build_time,
            samples_per_goal: samples_per_goal.max(1),
            roadmap_size,
            neighbours: DEFAULT_NEIGHBOURS,
            optimize_segments,
            seed,
        }
    }

    fn build_roadmap(
        &self,
        si: &dyn SpaceInformation,
        start: &Configuration,
        targets: &[Target],
        goal_radius: f64,
        termination: &Termination,
    ) -> (Roadmap, Vec<GoalNode>) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut roadmap = Roadmap::new(self.neighbours);
        roadmap.insert(si, start.clone());

        let mut goals = Vec::new();
        for (target_idx, target) in targets.iter().enumerate() {
            if termination.should_stop() {
                break;
            }
            for _ in 0..self.samples_per_goal {
                if let Some(state) = si.sample_near_target(&target.position, goal_radius, &mut rng)
                {
                    goals.push(GoalNode {
                        node: roadmap.insert(si, state),
                        target: target_idx,
                    });
                }
            }
        }

        let started = Instant::now();
        let mut attempts = 0;
        while roadmap.len() < self.roadmap_size
            && attempts < self.roadmap_size * ATTEMPTS_PER_NODE
            && started.elapsed() < self.build_time
            && !termination.should_stop()
        {
            attempts += 1;
            let state = si.sample_uniform(&mut rng);
            if si.is_valid(&state) {
                roadmap.insert(si, state);
            }
        }

        log::debug!(
            "prm.roadmap: nodes={} goal_samples={} attempts={attempts} elapsed={:.3}s",
            roadmap.len(),
            goals.len(),
            started.elapsed().as_secs_f64()
        );
        (roadmap, goals)
    }
}

impl MultiGoalPlanner for MultiGoalPrm {
    fn plan(
        &mut self,
        ctx: &mut PlanningContext,
        start: &Configuration,
        targets: &[Target],
        _scene: &Scene,
        termination: &Termination,
    ) -> Result<PlanResult> {
        let si = ctx.si.as_ref();
        if !si.is_valid(start) {
            log::debug!("prm.plan: invalid start");
            return Ok(PlanResult::empty());
        }

        let (roadmap, goals) =
            self.build_roadmap(si, start, targets, ctx.ptp.goal_radius(), termination);
        let from_start = roadmap.shortest_paths(0);
        let goals: Vec<GoalNode> = goals
            .into_iter()
            .filter(|g| from_start.dist[g.node].is_finite())
            .collect();
        if goals.is_empty() {
            log::debug!("prm.plan: no reachable goal samples targets={}", targets.len());
            return Ok(PlanResult::empty());
        }

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of_target: Vec<Option<usize>> = vec![None; targets.len()];
        for (item, goal) in goals.iter().enumerate() {
            match group_of_target[goal.target] {
                Some(group) => groups[group].push(item),
                None => {
                    group_of_target[goal.target] = Some(groups.len());
                    groups.push(vec![item]);
                }
            }
        }

        let trees: Vec<ShortestPaths> = goals
            .iter()
            .map(|g| roadmap.shortest_paths(g.node))
            .collect();
        let order = match tsp_open_end_grouped(
            ctx.routing.as_ref(),
            &groups,
            |i| from_start.dist[goals[i].node],
            |i, j| trees[i].dist[goals[j].node],
            termination,
        ) {
            Ok(order) => order,
            Err(err) if err.is_cancelled() => {
                log::debug!("prm.plan: stopped while ordering goals={}", goals.len());
                return Ok(PlanResult::empty());
            }
            Err(err) => return Err(err),
        };

        let mut result = PlanResult::empty();
        let mut current = 0;
        for item in order {
            if termination.should_stop() {
                log::debug!(
                    "prm.assemble: stopped segments={} of={}",
                    result.segments().len(),
                    groups.len()
                );
                break;
            }
            let goal = goals[item];
            let states: Vec<Configuration> = trees[item]
                .walk_from(current)
                .into_iter()
                .map(|node| roadmap.states[node].clone())
                .collect();
            let mut segment = PathSegment::new(Some(goal.target), states)?;
            if self.optimize_segments {
                segment = optimize_segment(si, segment, ctx.ptp.objective(), termination);
            }
            result.push(segment);
            current = goal.node;
        }

        log::debug!(
            "prm.plan: done segments={} visited={} length={:.4}",
            result.segments().len(),
            result.goals_visited(),
            result.length()
        );
        Ok(result)
    }

    fn name(&self) -> String {
        "MultiGoalPRM".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "build_time": self.build_time.as_secs_f64(),
            "samples_per_goal": self.samples_per_goal,
            "roadmap_size": self.roadmap_size,
            "neighbours": self.neighbours,
            "optimize_segments": self.optimize_segments,
            "seed": self.seed,
        })
    }
}
