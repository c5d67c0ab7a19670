//! Dependency resolution: topological ordering with priority tie-breaking
//! and cycle detection, over a declared task dependency graph.

use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use thiserror::Error;

/// A node in the dependency graph: just enough information to order it,
/// without the work-unit factory the executor attaches separately.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub name: String,
    pub dependencies: Vec<String>,
    pub priority: i64,
}

impl TaskNode {
    /// Creates a node with no dependencies and priority 0.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            priority: 0,
        }
    }

    /// Adds a dependency by name.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Sets the tie-breaking priority (higher runs earlier).
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

/// Errors raised while resolving a dependency graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("duplicate task name: {0}")]
    DuplicateName(String),
    #[error("task {task} depends on undeclared task {dependency}")]
    MissingDependency { task: String, dependency: String },
    #[error("cyclic dependency detected among: {0:?}")]
    Cycle(Vec<String>),
}

/// Resolves `nodes` into a valid dispatch order: every task appears after all
/// of its dependencies. Among tasks whose dependencies are simultaneously
/// satisfied, higher `priority` sorts first; ties break by declaration order.
pub fn resolve(nodes: &[TaskNode]) -> Result<Vec<String>, ResolverError> {
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();
    for (index, node) in nodes.iter().enumerate() {
        if index_by_name.insert(node.name.as_str(), index).is_some() {
            return Err(ResolverError::DuplicateName(node.name.clone()));
        }
    }

    for node in nodes {
        for dependency in &node.dependencies {
            if !index_by_name.contains_key(dependency.as_str()) {
                return Err(ResolverError::MissingDependency {
                    task: node.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    let mut in_degree: Vec<usize> = vec![0; nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        in_degree[index] = node.dependencies.len();
        for dependency in &node.dependencies {
            let dependency_index = index_by_name[dependency.as_str()];
            successors[dependency_index].push(index);
        }
    }

    #[derive(Eq, PartialEq)]
    struct Ready {
        priority: i64,
        insertion_order: std::cmp::Reverse<usize>,
        index: usize,
    }
    impl Ord for Ready {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            self.priority
                .cmp(&other.priority)
                .then_with(|| self.insertion_order.cmp(&other.insertion_order))
        }
    }
    impl PartialOrd for Ready {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }

    let mut heap: BinaryHeap<Ready> = BinaryHeap::new();
    for (index, &degree) in in_degree.iter().enumerate() {
        if degree == 0 {
            heap.push(Ready {
                priority: nodes[index].priority,
                insertion_order: std::cmp::Reverse(index),
                index,
            });
        }
    }

    let mut order = Vec::with_capacity(nodes.len());
    let mut remaining_in_degree = in_degree;
    while let Some(Ready { index, .. }) = heap.pop() {
        order.push(nodes[index].name.clone());
        for &successor in &successors[index] {
            remaining_in_degree[successor] -= 1;
            if remaining_in_degree[successor] == 0 {
                heap.push(Ready {
                    priority: nodes[successor].priority,
                    insertion_order: std::cmp::Reverse(successor),
                    index: successor,
                });
            }
        }
    }

    if order.len() != nodes.len() {
        let resolved: HashSet<&str> = order.iter().map(String::as_str).collect();
        let cyclic: Vec<String> = nodes
            .iter()
            .filter(|node| !resolved.contains(node.name.as_str()))
            .map(|node| node.name.clone())
            .collect();
        return Err(ResolverError::Cycle(cyclic));
    }

    Ok(order)
}

/// Every direct and transitive successor of `name`, keyed for fast lookup
/// during dependency-skip propagation in the executor.
pub fn transitive_successors(nodes: &[TaskNode], name: &str) -> HashSet<String> {
    let dependents: BTreeMap<&str, Vec<&str>> = {
        let mut map: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for node in nodes {
            for dependency in &node.dependencies {
                map.entry(dependency.as_str()).or_default().push(node.name.as_str());
            }
        }
        map
    };

    let mut result = HashSet::new();
    let mut stack = vec![name];
    while let Some(current) = stack.pop() {
        if let Some(children) = dependents.get(current) {
            for &child in children {
                if result.insert(child.to_string()) {
                    stack.push(child);
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_simple_chain() {
        let nodes = vec![
            TaskNode::new("c").depends_on("b"),
            TaskNode::new("b").depends_on("a"),
            TaskNode::new("a"),
        ];
        let order = resolve(&nodes).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn detects_cycles() {
        let nodes = vec![
            TaskNode::new("a").depends_on("b"),
            TaskNode::new("b").depends_on("a"),
        ];
        let err = resolve(&nodes).unwrap_err();
        assert!(matches!(err, ResolverError::Cycle(_)));
    }

    #[test]
    fn detects_missing_dependency() {
        let nodes = vec![TaskNode::new("a").depends_on("missing")];
        let err = resolve(&nodes).unwrap_err();
        assert_eq!(
            err,
            ResolverError::MissingDependency {
                task: "a".to_string(),
                dependency: "missing".to_string()
            }
        );
    }

    #[test]
    fn detects_duplicate_names() {
        let nodes = vec![TaskNode::new("a"), TaskNode::new("a")];
        let err = resolve(&nodes).unwrap_err();
        assert_eq!(err, ResolverError::DuplicateName("a".to_string()));
    }

    #[test]
    fn priority_breaks_ties_among_ready_tasks() {
        let nodes = vec![
            TaskNode::new("low").priority(0),
            TaskNode::new("high").priority(10),
        ];
        let order = resolve(&nodes).unwrap();
        assert_eq!(order, vec!["high", "low"]);
    }

    #[test]
    fn insertion_order_breaks_ties_when_priority_is_equal() {
        let nodes = vec![TaskNode::new("first"), TaskNode::new("second")];
        let order = resolve(&nodes).unwrap();
        assert_eq!(order, vec!["first", "second"]);
    }

    #[test]
    fn resolve_is_idempotent_up_to_stable_ordering() {
        let nodes = vec![
            TaskNode::new("c").depends_on("a"),
            TaskNode::new("b").depends_on("a"),
            TaskNode::new("a"),
        ];
        let first = resolve(&nodes).unwrap();
        let second = resolve(&nodes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn transitive_successors_follow_the_full_chain() {
        let nodes = vec![
            TaskNode::new("a"),
            TaskNode::new("b").depends_on("a"),
            TaskNode::new("c").depends_on("b"),
        ];
        let successors = transitive_successors(&nodes, "a");
        assert!(successors.contains("b"));
        assert!(successors.contains("c"));
    }

    proptest::proptest! {
        #[test]
        fn resolve_never_panics_on_arbitrary_chains(len in 0usize..20) {
            let nodes: Vec<TaskNode> = (0..len)
                .map(|i| {
                    let mut node = TaskNode::new(format!("t{i}"));
                    if i > 0 {
                        node = node.depends_on(format!("t{}", i - 1));
                    }
                    node
                })
                .collect();
            let order = resolve(&nodes).unwrap();
            assert_eq!(order.len(), len);
        }
    }
}
