//! Root component and launch entry point.

use crate::client::auth::Auth;
use crate::client::graphql::GraphQLClient;
use crate::client::use_auth::use_auth_provider;
use crate::router::Route;
use dioxus::prelude::*;
use tracing;

/// Root component: installs the auth context and renders the router.
///
/// Expects an [`Auth`] in root context, as set up by [`launch`].
#[component]
pub fn App() -> Element {
    let auth = use_context::<Auth>();
    use_auth_provider(auth);

    rsx! {
        Router::<Route> {}
    }
}

/// Starts the app with `auth` and `graphql` available to every component.
///
/// Build `auth` with [`Auth::select`] over a rehydrated
/// [`SessionStore`](crate::client::session::SessionStore), and `graphql` with
/// [`GraphQLClient::for_auth`].
pub fn launch(auth: Auth, graphql: GraphQLClient) {
    dioxus::logger::initialize_default();
    tracing::info!(
        "Launching app (password flow: {}, API: {})",
        auth.uses_password_flow(),
        graphql.url()
    );

    dioxus::LaunchBuilder::new()
        .with_context(auth)
        .with_context(graphql)
        .launch(App);
}
