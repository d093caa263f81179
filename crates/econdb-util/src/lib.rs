pub mod client_ext;
pub mod dates;

pub use crate::client_ext::{build_client, classify, ClientUtilExt as Util, StatusClass, BROWSER_USER_AGENT};
pub use crate::dates::{days_inclusive, parse_date, ISO_DATE};
