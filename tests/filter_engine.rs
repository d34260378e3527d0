// tests/filter_engine.rs

use proptest::prelude::*;

use stepwatch::filter::{
    CompositeFilter, FilterOptions, NoOpFilter, SkipReason, StepFilter, StepIndexFilter,
    StepRange, StringMatcher, build_step_filter,
};
use stepwatch::pipeline::Job;
use stepwatch_test_utils::{JobBuilder, checkout_build_test_deploy};

fn decisions(filter: &dyn StepFilter, job: &Job) -> Vec<(String, bool, SkipReason)> {
    job.steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let r = filter.should_execute(step, i + 1, job);
            (step.name.clone(), r.should_execute, r.skip_reason)
        })
        .collect()
}

#[test]
fn build_selected_and_deploy_skipped() {
    let pipeline = checkout_build_test_deploy();
    let job = &pipeline.jobs[0];

    let options = FilterOptions {
        step_names: vec!["Build".into()],
        skip_steps: vec!["Deploy".into()],
        ..Default::default()
    };
    let filter = CompositeFilter::from_options(&options, StringMatcher::default());

    assert_eq!(
        decisions(&filter, job),
        vec![
            ("Checkout".into(), false, SkipReason::FilteredOut),
            ("Build".into(), true, SkipReason::None),
            ("Test".into(), false, SkipReason::FilteredOut),
            ("Deploy".into(), false, SkipReason::ExplicitlySkipped),
        ]
    );
}

#[test]
fn inclusion_kinds_combine_with_or() {
    let pipeline = checkout_build_test_deploy();
    let job = &pipeline.jobs[0];

    let options = FilterOptions {
        step_names: vec!["Checkout".into()],
        step_indices: [3].into_iter().collect(),
        step_ranges: vec![StepRange::Numeric { start: 4, end: 4 }],
        ..Default::default()
    };
    let filter = CompositeFilter::from_options(&options, StringMatcher::default());

    let run: Vec<bool> = decisions(&filter, job).into_iter().map(|d| d.1).collect();
    assert_eq!(run, vec![true, false, true, true]);
}

#[test]
fn exclusion_wins_over_inclusion() {
    let pipeline = checkout_build_test_deploy();
    let job = &pipeline.jobs[0];

    let options = FilterOptions {
        step_indices: [1, 2, 3, 4].into_iter().collect(),
        skip_steps: vec!["test".into()],
        ..Default::default()
    };
    let filter = CompositeFilter::from_options(&options, StringMatcher::default());

    let test = &job.steps[2];
    let r = filter.should_execute(test, 3, job);
    assert!(!r.should_execute);
    assert_eq!(r.skip_reason, SkipReason::ExplicitlySkipped);
}

#[test]
fn only_exclusions_execute_everything_else() {
    let pipeline = checkout_build_test_deploy();
    let job = &pipeline.jobs[0];

    let options = FilterOptions {
        skip_steps: vec!["Deploy".into()],
        ..Default::default()
    };
    let filter = CompositeFilter::from_options(&options, StringMatcher::default());

    let run: Vec<bool> = decisions(&filter, job).into_iter().map(|d| d.1).collect();
    assert_eq!(run, vec![true, true, true, false]);
}

#[test]
fn job_filter_short_circuits() {
    let lint = JobBuilder::new("lint").named("Lint").steps(&["Build"]).build();
    let build = JobBuilder::new("build").steps(&["Build"]).build();

    let options = FilterOptions {
        step_names: vec!["Build".into()],
        job_names: vec!["lint".into()],
        ..Default::default()
    };
    let filter = CompositeFilter::from_options(&options, StringMatcher::default());

    assert!(filter.should_execute(&lint.steps[0], 1, &lint).should_execute);

    let r = filter.should_execute(&build.steps[0], 1, &build);
    assert!(!r.should_execute);
    assert_eq!(r.skip_reason, SkipReason::JobNotSelected);
}

#[test]
fn names_match_exact_then_substring_then_typo() {
    let job = JobBuilder::new("ci")
        .steps(&["Run Unit Tests", "Build", "Publish"])
        .build();

    for pattern in ["build", "unit", "Biuld"] {
        let options = FilterOptions {
            step_names: vec![pattern.into()],
            ..Default::default()
        };
        let filter = CompositeFilter::from_options(&options, StringMatcher::default());
        let selected: Vec<String> = decisions(&filter, &job)
            .into_iter()
            .filter(|d| d.1)
            .map(|d| d.0)
            .collect();
        assert_eq!(selected.len(), 1, "pattern {pattern:?} selected {selected:?}");
    }
}

#[test]
fn no_filters_take_the_noop_fast_path() {
    let filter = build_step_filter(&FilterOptions::default(), StringMatcher::default());
    assert_eq!(format!("{filter:?}"), format!("{:?}", NoOpFilter));

    let pipeline = checkout_build_test_deploy();
    let job = &pipeline.jobs[0];
    assert!(decisions(filter.as_ref(), job).iter().all(|d| d.1));
}

proptest! {
    #[test]
    fn index_filter_selects_exactly_its_positions(
        indices in proptest::collection::btree_set(1usize..20, 0..8),
        len in 1usize..20,
    ) {
        let names: Vec<String> = (1..=len).map(|i| format!("step-{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let job = JobBuilder::new("job").steps(&refs).build();
        let filter = StepIndexFilter::new(indices.iter().copied());

        for (i, step) in job.steps.iter().enumerate() {
            let r = filter.should_execute(step, i + 1, &job);
            prop_assert_eq!(r.should_execute, indices.contains(&(i + 1)));
        }
    }

    #[test]
    fn excluded_steps_never_execute(
        indices in proptest::collection::btree_set(1usize..6, 0..6),
        skip in 0usize..4,
    ) {
        let pipeline = checkout_build_test_deploy();
        let job = &pipeline.jobs[0];
        let skipped = job.steps[skip].name.clone();

        let options = FilterOptions {
            step_indices: indices,
            step_names: vec![skipped.clone()],
            skip_steps: vec![skipped],
            ..Default::default()
        };
        let filter = CompositeFilter::from_options(&options, StringMatcher::default());
        let r = filter.should_execute(&job.steps[skip], skip + 1, job);

        prop_assert!(!r.should_execute);
        prop_assert_eq!(r.skip_reason, SkipReason::ExplicitlySkipped);
    }
}
