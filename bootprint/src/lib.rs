//! # bootprint
//!
//! Render a documentation site from a template module and an input document.
//!
//! | Module       | Purpose                                                     |
//! |--------------|-------------------------------------------------------------|
//! | [`input`]    | raw document, file path or URL → parsed document            |
//! | [`module`]   | module reference → [`bootprint_renderer::Module`]           |
//! | [`error`]    | error types and input-error classification                  |
//! | [`pipeline`] | [`Bootprint`]: module + override config + input → files      |
//! | [`writer`]   | atomic writes below the target directory                    |
//! | [`diff`]     | unified diff of a render against the target directory       |
//!
//! ```rust,no_run
//! use bootprint::{Bootprint, RunOptions};
//!
//! # async fn example() -> Result<(), bootprint::BootprintError> {
//! let report = Bootprint::new("base", serde_json::Value::Null)
//!     .run("petstore.yaml", &RunOptions::new("site"))
//!     .await?;
//! println!("{} file(s) written", report.written());
//! # Ok(())
//! # }
//! ```

pub mod diff;
pub mod error;
pub mod input;
pub mod module;
pub mod pipeline;
pub mod writer;

pub use diff::{diff_files, FileDiff};
pub use error::{
    classify_input_error, BootprintError, ErrorCause, InputError, LoadDataError, ModuleError,
    WriteError,
};
pub use input::{load_input, InputRef};
pub use module::{DirectoryModule, ModuleRef, ModuleRegistry, ModuleResolver};
pub use pipeline::{Bootprint, RunOptions, RunReport};
pub use writer::{write_files, WriteResult};
