#![allow(dead_code)]

use stepwatch::pipeline::{Job, Pipeline, Step};

/// Builder for `Pipeline` to simplify test setup.
pub struct PipelineBuilder {
    name: String,
    jobs: Vec<Job>,
}

impl PipelineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            jobs: Vec::new(),
        }
    }

    pub fn with_job(mut self, job: JobBuilder) -> Self {
        self.jobs.push(job.build());
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline::new(self.name, self.jobs)
    }
}

/// Builder for `Job`. Steps get a harmless `echo` command unless given one.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            job: Job::new(id, "", Vec::new()),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.job.name = name.to_string();
        self
    }

    pub fn step(mut self, name: &str) -> Self {
        let run = format!("echo {name}");
        self.job.steps.push(Step::new(name, run));
        self
    }

    pub fn steps(mut self, names: &[&str]) -> Self {
        for name in names {
            self = self.step(name);
        }
        self
    }

    pub fn step_with(mut self, step: Step) -> Self {
        self.job.steps.push(step);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.job.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

/// The canonical four-step job used across the filter tests.
pub fn checkout_build_test_deploy() -> Pipeline {
    PipelineBuilder::new("ci")
        .with_job(JobBuilder::new("build").steps(&["Checkout", "Build", "Test", "Deploy"]))
        .build()
}
