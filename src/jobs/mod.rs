pub mod user_growth_job;
