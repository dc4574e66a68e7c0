//! # gallery-ai
//!
//! AI-powered image gallery — browse a seeded collection, ingest local photos,
//! generate new images from text prompts, and get AI-written descriptions of
//! anything on screen, all backed by Google Gemini vision models.
//!
//! ## Quick Start
//!
//! The flow module ties the pieces together: validate user input, call the
//! remote service, and shape the result for the gallery:
//!
//! ```rust,no_run
//! use gallery_ai::ai::{AspectRatio, gemini::GeminiService};
//! use gallery_ai::config::Config;
//! use gallery_ai::flow::{self, GenerationOutcome};
//! use gallery_ai::gallery::Gallery;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Credential and model names come from the environment (GEMINI_API_KEY).
//!     let config = Config::from_env();
//!     let service = GeminiService::new(&config);
//!
//!     let mut gallery = Gallery::with_samples();
//!
//!     // Ask the backend for a new image and put it at the gallery head.
//!     match flow::generate_image(&service, "a red apple", AspectRatio::Square).await {
//!         GenerationOutcome::Generated(record) => {
//!             let id = record.id.clone();
//!             gallery.insert_front(record);
//!             gallery.select(Some(&id));
//!         }
//!         GenerationOutcome::Failed(message) => eprintln!("{message}"),
//!         GenerationOutcome::SkippedEmptyPrompt => {}
//!     }
//!
//!     // Describe whatever is selected.
//!     if let Some(record) = gallery.selected() {
//!         let outcome = flow::analyze_record(&service, record, false).await;
//!         println!("{}", outcome.text());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The ingestion helpers and the service trait can also be used directly:
//!
//! ```rust,no_run
//! use gallery_ai::ai::{AiService, gemini::GeminiService};
//! use gallery_ai::config::Config;
//! use gallery_ai::ingest;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Ingest a local file into a self-contained record.
//!     let record = ingest::record_from_file(Path::new("photo.jpg")).await?;
//!     println!("{} ({})", record.title, record.origin.as_str());
//!
//!     // 2. Describe it straight through the service trait.
//!     let service = GeminiService::new(&Config::from_env());
//!     let description = service
//!         .analyze(
//!             record.base64_data.as_deref().unwrap_or_default(),
//!             "image/jpeg",
//!             "Describe this image in detail.",
//!         )
//!         .await?;
//!     println!("{description}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Upload Formats
//!
//! | Format | Extensions |
//! |--------|------------|
//! | JPEG | `.jpg`, `.jpeg` |
//! | PNG | `.png` |
//! | WebP | `.webp` |
//! | GIF | `.gif` |
//! | BMP | `.bmp` |
//!
//! ## Modules
//!
//! - [`ai`] — remote service trait, error types, and the Gemini implementation
//! - [`config`] — credential and model names from the environment
//! - [`flow`] — generation and analysis flows connecting the service to the gallery
//! - [`gallery`] — in-memory record collection, selection, and navigation
//! - [`ingest`] — local image files to gallery records

pub mod ai;
pub mod config;
pub mod flow;
pub mod gallery;
pub mod ingest;
