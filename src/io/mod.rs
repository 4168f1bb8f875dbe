pub mod lock;
pub mod logging;
pub mod project_io;
pub mod session;
pub mod sheet_io;
