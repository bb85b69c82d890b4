//! Dependency graph construction and topological ordering.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use taskweave_core::Task;

/// A dependency id that names no task in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingDependency {
    /// Task declaring the dependency
    pub task_id: String,
    /// The missing id
    pub dependency: String,
}

/// Result of Kahn's algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologicalOrder {
    /// Visited task ids, dependencies first
    pub order: Vec<String>,
    /// False when a cycle kept some tasks out of `order`
    pub ok: bool,
}

/// Adjacency representation of a task list.
///
/// Edges run from a dependency to its dependents. Dependency ids that are not
/// in the task list are left out of the graph and kept in [`dangling`].
///
/// [`dangling`]: DependencyGraph::dangling
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Unique task ids in input order
    order: Vec<String>,
    /// dependency -> dependents
    adjacency: HashMap<String, Vec<String>>,
    /// task -> number of in-plan dependencies
    in_degree: HashMap<String, usize>,
    /// task -> in-plan dependencies
    dependencies: BTreeMap<String, BTreeSet<String>>,
    dangling: Vec<DanglingDependency>,
    duplicates: Vec<String>,
}

impl DependencyGraph {
    /// Build the graph. Pure function of the task list.
    ///
    /// When an id occurs twice only the first task is kept; the id is
    /// recorded in [`duplicates`](Self::duplicates).
    pub fn build(tasks: &[Task]) -> Self {
        let mut graph = Self::default();
        let mut kept = Vec::with_capacity(tasks.len());

        for task in tasks {
            if graph.in_degree.contains_key(&task.id) {
                if !graph.duplicates.contains(&task.id) {
                    graph.duplicates.push(task.id.clone());
                }
                continue;
            }
            graph.order.push(task.id.clone());
            graph.in_degree.insert(task.id.clone(), 0);
            graph.adjacency.insert(task.id.clone(), Vec::new());
            graph.dependencies.insert(task.id.clone(), BTreeSet::new());
            kept.push(task);
        }

        for task in kept {
            for dep in &task.dependencies {
                if !graph.in_degree.contains_key(dep) {
                    let dangling = DanglingDependency {
                        task_id: task.id.clone(),
                        dependency: dep.clone(),
                    };
                    if !graph.dangling.contains(&dangling) {
                        graph.dangling.push(dangling);
                    }
                    continue;
                }

                let fresh = graph
                    .dependencies
                    .get_mut(&task.id)
                    .map(|deps| deps.insert(dep.clone()))
                    .unwrap_or(false);
                if !fresh {
                    continue;
                }

                graph.adjacency.entry(dep.clone()).or_default().push(task.id.clone());
                *graph.in_degree.entry(task.id.clone()).or_default() += 1;
            }
        }

        graph
    }

    /// Unique task ids in input order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Tasks that depend on `id`.
    pub fn dependents(&self, id: &str) -> &[String] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of in-plan dependencies of `id`.
    pub fn in_degree(&self, id: &str) -> usize {
        self.in_degree.get(id).copied().unwrap_or(0)
    }

    /// task id -> in-plan dependency ids.
    pub fn dependencies(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.dependencies
    }

    /// Dependencies that name no task.
    pub fn dangling(&self) -> &[DanglingDependency] {
        &self.dangling
    }

    /// Ids that occurred more than once.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Whether `id` is a task of this graph.
    pub fn contains(&self, id: &str) -> bool {
        self.in_degree.contains_key(id)
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Topological sort using Kahn's algorithm
    ///
    /// The queue is seeded in input order and dependents are released in the
    /// order they were declared, so the output is deterministic.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    pub fn topological_sort(&self) -> TopologicalOrder {
        let mut in_degree = self.in_degree.clone();
        let mut queue: VecDeque<&String> = self
            .order
            .iter()
            .filter(|id| self.in_degree(id) == 0)
            .collect();
        let mut order = Vec::with_capacity(self.order.len());

        while let Some(current) = queue.pop_front() {
            order.push(current.clone());

            for dependent in self.dependents(current) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        let ok = order.len() == self.order.len();
        TopologicalOrder { order, ok }
    }

    /// Find one dependency cycle, returned with its first node repeated last.
    ///
    /// Depth-first search over "depends on" edges with an explicit stack, so
    /// long dependency chains cannot overflow the call stack.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = self
            .order
            .iter()
            .map(|id| (id.as_str(), Mark::Unvisited))
            .collect();

        for root in &self.order {
            if marks.get(root.as_str()) != Some(&Mark::Unvisited) {
                continue;
            }

            marks.insert(root.as_str(), Mark::InProgress);
            let mut stack: Vec<(&str, Vec<&str>)> =
                vec![(root.as_str(), self.pending_deps(root))];

            loop {
                let Some(top) = stack.last_mut() else {
                    break;
                };
                let node = top.0;
                let next = top.1.pop();

                match next {
                    Some(dep) => match marks.get(dep).copied().unwrap_or(Mark::Done) {
                        Mark::Unvisited => {
                            marks.insert(dep, Mark::InProgress);
                            stack.push((dep, self.pending_deps(dep)));
                        }
                        Mark::InProgress => {
                            let start = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
                            let mut cycle: Vec<String> =
                                stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                            cycle.push(dep.to_string());
                            return Some(cycle);
                        }
                        Mark::Done => {}
                    },
                    None => {
                        marks.insert(node, Mark::Done);
                        stack.pop();
                    }
                }
            }
        }

        None
    }

    /// Dependencies of `id`, reversed so that popping yields them in order.
    fn pending_deps(&self, id: &str) -> Vec<&str> {
        self.dependencies
            .get(id)
            .map(|deps| deps.iter().rev().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Ids left out of a topological order (members of, or downstream of, a cycle).
    pub fn unordered<'a>(&'a self, sorted: &TopologicalOrder) -> Vec<&'a str> {
        let visited: HashSet<&str> = sorted.order.iter().map(String::as_str).collect();
        self.order
            .iter()
            .map(String::as_str)
            .filter(|id| !visited.contains(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, deps: &[&str]) -> Task {
        deps.iter().fold(Task::new(id, "quality"), |t, d| t.depends_on(*d))
    }

    fn diamond() -> Vec<Task> {
        vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["a"]),
            task("d", &["b", "c"]),
        ]
    }

    #[test]
    fn test_build_adjacency_and_in_degree() {
        let graph = DependencyGraph::build(&diamond());
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.dependents("a"), ["b", "c"]);
        assert_eq!(graph.in_degree("a"), 0);
        assert_eq!(graph.in_degree("d"), 2);
        assert!(graph.dangling().is_empty());
    }

    #[test]
    fn test_build_drops_dangling_dependencies() {
        let graph = DependencyGraph::build(&[task("a", &["ghost"]), task("b", &["a", "ghost"])]);
        assert_eq!(graph.in_degree("a"), 0);
        assert_eq!(graph.in_degree("b"), 1);
        assert_eq!(graph.dangling().len(), 2);
        assert_eq!(graph.dangling()[0].task_id, "a");
        assert_eq!(graph.dangling()[0].dependency, "ghost");
        assert!(graph.dependencies()["a"].is_empty());
    }

    #[test]
    fn test_build_ignores_repeated_dependency() {
        let graph = DependencyGraph::build(&[task("a", &[]), task("b", &["a", "a"])]);
        assert_eq!(graph.in_degree("b"), 1);
        assert_eq!(graph.dependents("a"), ["b"]);
    }

    #[test]
    fn test_build_records_duplicates() {
        let graph = DependencyGraph::build(&[task("a", &[]), task("a", &[]), task("a", &[])]);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.duplicates(), ["a"]);
    }

    #[test]
    fn test_topological_sort_diamond() {
        let sorted = DependencyGraph::build(&diamond()).topological_sort();
        assert!(sorted.ok);
        assert_eq!(sorted.order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_topological_sort_respects_input_order_tie_break() {
        let tasks = vec![task("z", &[]), task("y", &[]), task("x", &["z"])];
        let sorted = DependencyGraph::build(&tasks).topological_sort();
        assert_eq!(sorted.order, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_topological_sort_every_task_after_its_dependencies() {
        let tasks = vec![
            task("docs", &["qf", "qb"]),
            task("qf", &["ui"]),
            task("qb", &["api"]),
            task("api", &["ui"]),
            task("ui", &["layout"]),
            task("layout", &["vision", "ocr"]),
            task("vision", &[]),
            task("ocr", &[]),
        ];
        let sorted = DependencyGraph::build(&tasks).topological_sort();
        assert!(sorted.ok);

        let pos = |id: &str| sorted.order.iter().position(|x| x == id).unwrap();
        for t in &tasks {
            for dep in &t.dependencies {
                assert!(pos(dep) < pos(&t.id), "{} must precede {}", dep, t.id);
            }
        }
    }

    #[test]
    fn test_topological_sort_detects_cycle() {
        let graph = DependencyGraph::build(&[task("x", &["y"]), task("y", &["x"])]);
        let sorted = graph.topological_sort();
        assert!(!sorted.ok);
        assert!(sorted.order.is_empty());
        assert_eq!(graph.unordered(&sorted), vec!["x", "y"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let graph = DependencyGraph::build(&[task("a", &["a"])]);
        assert!(!graph.topological_sort().ok);
        assert_eq!(graph.find_cycle(), Some(vec!["a".to_string(), "a".to_string()]));
    }

    #[test]
    fn test_find_cycle_path() {
        let graph = DependencyGraph::build(&[task("x", &["y"]), task("y", &["x"])]);
        assert_eq!(
            graph.find_cycle(),
            Some(vec!["x".to_string(), "y".to_string(), "x".to_string()])
        );
    }

    #[test]
    fn test_find_cycle_none_for_dag() {
        assert_eq!(DependencyGraph::build(&diamond()).find_cycle(), None);
    }

    #[test]
    fn test_find_cycle_behind_acyclic_prefix() {
        let graph = DependencyGraph::build(&[
            task("root", &[]),
            task("a", &["root", "c"]),
            task("b", &["a"]),
            task("c", &["b"]),
        ]);
        let cycle = graph.find_cycle().unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
        assert!(!cycle.contains(&"root".to_string()));
    }

    #[test]
    fn test_find_cycle_long_chain_does_not_overflow() {
        let mut tasks = vec![task("n0", &[])];
        for i in 1..50_000 {
            let prev = format!("n{}", i - 1);
            tasks.push(task(&format!("n{}", i), &[prev.as_str()]));
        }
        let graph = DependencyGraph::build(&tasks);
        assert_eq!(graph.find_cycle(), None);
        assert!(graph.topological_sort().ok);
    }
}
