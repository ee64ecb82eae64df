mod browse;
mod favorites;
mod helpers;

pub(crate) use browse::{cmd_categories, cmd_meals, cmd_show};
pub(crate) use favorites::{
    cmd_favorites_add, cmd_favorites_clear, cmd_favorites_list, cmd_favorites_remove,
    cmd_favorites_toggle, cmd_favorites_watch,
};
