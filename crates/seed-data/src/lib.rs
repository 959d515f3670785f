//! Seed data for the hospital management app.
//!
//! Inserts doctor records into the document database, one collection per
//! run, and prints a confirmation line once every record is in.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seed_data::prelude::*;
//!
//! // Whole run as configured through the environment:
//! let report = seed_from_config(&SeedConfig::from_env(), &mut std::io::stdout()).await?;
//!
//! // Or with an explicitly connected handle:
//! let client = docstore::connect("serviceAccountKey.json", &Default::default()).await?;
//! Seeder::new(client)
//!     .run(&Dataset::doctors(), &mut std::io::stdout())
//!     .await?;
//! ```

pub mod config;
pub mod dataset;
pub mod record;
pub mod seeder;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::SeedConfig;
    pub use crate::dataset::{Dataset, DatasetError, DatasetSource};
    pub use crate::record::Record;
    pub use crate::seeder::{CONFIRMATION, SeedError, SeedReport, Seeder, seed_from_config};
}
