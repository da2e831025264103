mod cook;
mod edit;
mod pack;
mod plan;

pub use cook::cook_presets;
pub use edit::edit_config;
pub use pack::pack_presets;
pub use plan::plan_presets;
