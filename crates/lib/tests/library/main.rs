//! Library-level tests for synthesis and deployment preview.

mod build_branch_tests;
mod condition_tests;
mod grant_tests;
mod schedule_tests;
mod synth_tests;
mod template_tests;
