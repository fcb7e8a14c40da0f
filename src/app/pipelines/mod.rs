pub mod story_pipeline;
