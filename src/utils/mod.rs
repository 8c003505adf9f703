pub mod auto_absence;
pub mod db_utils;
pub mod normalize;
pub mod photo_cache;
pub mod time_fmt;
