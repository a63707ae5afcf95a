//! Client-side routes.

use crate::views::Index;
use dioxus::prelude::*;

/// Every page of the app. `/` is the only route; unknown paths do not parse.
#[derive(Routable, Clone, Debug, PartialEq)]
pub enum Route {
    #[route("/")]
    Index {},
}

impl Route {
    /// Stable route name, independent of the path.
    pub fn name(&self) -> &'static str {
        match self {
            Route::Index {} => "index",
        }
    }
}
