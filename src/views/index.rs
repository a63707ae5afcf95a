use crate::client::use_auth::AuthContext;
use dioxus::prelude::*;

/// Landing page.
///
/// Shows who is signed in when rendered under `use_auth_provider`; renders
/// standalone otherwise.
#[component]
pub fn Index() -> Element {
    let signed_in = try_use_context::<AuthContext>().and_then(|auth| auth.user());

    rsx! {
        main { class: "index",
            h1 { "Gestione Caselo" }
            if let Some(user) = signed_in {
                p { class: "signed-in", "Signed in as {user.email}" }
            }
        }
    }
}
