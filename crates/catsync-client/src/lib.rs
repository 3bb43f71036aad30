pub mod error;
pub mod http;
pub mod normalize;
pub mod parse;
pub mod source;
pub mod target;
pub mod types;

pub use error::{HttpError, NormalizeError, SourceError};
pub use http::{HttpClient, JsonResponse};
pub use normalize::{normalize_all, normalize_product, NormalizeContext, NormalizationResult};
pub use source::{ProductFilter, SourceApi};
pub use target::{ImportOutcome, TargetApi};
pub use types::{InventoryIndex, InventoryRecord, RawProduct};
