pub mod api_client;
pub mod color_ranker;
pub mod color_sample;
pub mod config;
pub mod image_source;
pub mod logo_error;
pub mod logo_pipeline;
pub mod promotions;
pub mod region_extractor;
pub mod seed_queue;
pub mod seeder;
