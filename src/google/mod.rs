pub mod api;
pub mod auth;
pub mod drive;
pub mod sheets;
pub mod youtube;

pub use auth::load_session;
pub use drive::DriveStore;
pub use sheets::SheetsLedger;
pub use youtube::YouTubeCaptions;
