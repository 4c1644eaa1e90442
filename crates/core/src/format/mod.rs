pub mod commodity;
pub mod weather;

pub use commodity::{format_commodity, NO_COMMODITY_DATA};
pub use weather::{advisory_tips, describe_weather_code, format_weather};
