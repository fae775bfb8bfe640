pub mod pipeline_logger;
pub mod stage_runner;
pub mod transcribe_use_case;
