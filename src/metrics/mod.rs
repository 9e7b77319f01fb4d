pub mod hwmon;
pub mod scrape;
pub mod util;
