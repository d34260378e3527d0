// tests/dependency_analyzer.rs

use proptest::prelude::*;

use stepwatch::dag::{DependencyAnalyzer, DependencyGraph, DependencyRule, StepNode, step_id};
use stepwatch::errors::StepwatchError;
use stepwatch::filter::{FilterOptions, StepFilterBuilder};
use stepwatch::pipeline::Job;
use stepwatch_test_utils::{JobBuilder, PipelineBuilder, checkout_build_test_deploy};

fn sequential_pipeline(n: usize) -> stepwatch::pipeline::Pipeline {
    let names: Vec<String> = (1..=n).map(|i| format!("step {i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    PipelineBuilder::new("seq")
        .with_job(JobBuilder::new("job").steps(&refs))
        .build()
}

fn indices(options: &FilterOptions) -> Vec<usize> {
    options.step_indices.iter().copied().collect()
}

#[test]
fn graph_has_one_node_per_step_and_no_cross_job_edges() {
    let pipeline = PipelineBuilder::new("ci")
        .with_job(JobBuilder::new("a").steps(&["1", "2", "3"]))
        .with_job(JobBuilder::new("b").steps(&["1", "2"]))
        .build();
    let graph = DependencyAnalyzer::default().build_graph(&pipeline);

    assert_eq!(graph.len(), 5);
    assert!(!graph.has_cycle());
    assert!(graph.dependencies_of(&step_id("b", 1)).is_empty());

    let closure: Vec<usize> = graph
        .transitive_dependencies(&step_id("a", 3))
        .iter()
        .map(|n| n.position)
        .collect();
    assert_eq!(closure, vec![1, 2]);

    let order: Vec<String> = graph
        .topological_order()
        .unwrap()
        .into_iter()
        .map(|n| n.id.clone())
        .collect();
    let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
    assert!(pos("a#1") < pos("a#2") && pos("a#2") < pos("a#3"));
    assert!(pos("b#1") < pos("b#2"));
}

/// Every step depends on the first one, plus some positions that do not exist.
#[derive(Debug)]
struct FanOutRule;

impl DependencyRule for FanOutRule {
    fn predecessors(&self, job: &Job, position: usize) -> Vec<usize> {
        if position == 1 {
            vec![0, job.steps.len() + 1]
        } else {
            vec![1, 0, job.steps.len() + 7]
        }
    }
}

#[test]
fn custom_rule_edges_are_built_and_invalid_positions_ignored() {
    let pipeline = sequential_pipeline(4);
    let graph = DependencyAnalyzer::default()
        .with_rule(FanOutRule)
        .build_graph(&pipeline);

    assert_eq!(graph.len(), 4);
    assert!(!graph.has_cycle());
    assert!(graph.dependencies_of(&step_id("job", 1)).is_empty());
    for position in 2..=4 {
        let deps: Vec<usize> = graph
            .dependencies_of(&step_id("job", position))
            .iter()
            .map(|n| n.position)
            .collect();
        assert_eq!(deps, vec![1], "step {position}");
    }
}

#[test]
fn cycles_are_detected() {
    let mut graph = DependencyGraph::new();
    for (pos, name) in ["x", "y"].iter().enumerate() {
        graph.add_node(StepNode {
            id: step_id("j", pos + 1),
            job_id: "j".into(),
            step_name: name.to_string(),
            position: pos + 1,
        });
    }
    graph.add_dependency("j#2", "j#1").unwrap();
    graph.add_dependency("j#1", "j#2").unwrap();

    assert!(graph.has_cycle());
    assert!(matches!(
        graph.topological_order(),
        Err(StepwatchError::DependencyCycle(_))
    ));
    assert!(graph.add_dependency("j#1", "missing").is_err());
}

#[test]
fn expansion_is_a_noop_without_the_flag() {
    let pipeline = checkout_build_test_deploy();
    let options = FilterOptions {
        step_indices: [4].into_iter().collect(),
        ..Default::default()
    };
    let expanded = DependencyAnalyzer::default().expand_with_dependencies(&options, &pipeline);
    assert_eq!(expanded, options);
}

#[test]
fn first_step_adds_nothing() {
    let pipeline = checkout_build_test_deploy();
    let options = FilterOptions {
        step_indices: [1].into_iter().collect(),
        include_dependencies: true,
        ..Default::default()
    };
    let expanded = DependencyAnalyzer::default().expand_with_dependencies(&options, &pipeline);
    assert_eq!(indices(&expanded), vec![1]);
}

#[test]
fn named_selection_pulls_in_predecessors() {
    let pipeline = checkout_build_test_deploy();
    let built = StepFilterBuilder::new()
        .step_names(["Test"])
        .include_dependencies(true)
        .build(&pipeline);

    assert!(built.validation.is_valid());
    assert_eq!(indices(&built.options), vec![1, 2]);
    assert_eq!(built.validation.matched_steps, 3);
}

#[test]
fn skipped_steps_stay_skipped_after_expansion() {
    let pipeline = checkout_build_test_deploy();
    let built = StepFilterBuilder::new()
        .step_names(["Deploy"])
        .skip_steps(["Build"])
        .include_dependencies(true)
        .build(&pipeline);

    let job = &pipeline.jobs[0];
    let run: Vec<bool> = job
        .steps
        .iter()
        .enumerate()
        .map(|(i, s)| built.filter.should_execute(s, i + 1, job).should_execute)
        .collect();
    assert_eq!(run, vec![true, false, true, true]);
}

proptest! {
    #[test]
    fn selecting_the_last_step_expands_to_all(n in 1usize..30) {
        let pipeline = sequential_pipeline(n);
        let options = FilterOptions {
            step_indices: [n].into_iter().collect(),
            include_dependencies: true,
            ..Default::default()
        };
        let analyzer = DependencyAnalyzer::default();
        let expanded = analyzer.expand_with_dependencies(&options, &pipeline);
        prop_assert_eq!(indices(&expanded), (1..=n).collect::<Vec<_>>());

        // Idempotent.
        let again = analyzer.expand_with_dependencies(&expanded, &pipeline);
        prop_assert_eq!(again, expanded);
    }
}
