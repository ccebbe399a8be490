//! Catalog listing.

use crate::core::session::ChatSession;

pub fn list_models(session: &ChatSession) {
    let credentials = &session.settings().credentials;
    let selected = session.model();

    println!("🤖 Available Models");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for group in session.catalog().groups() {
        println!();
        let status = match group.provider() {
            Some(provider) if credentials.is_usable(provider) => "✅ key saved".to_string(),
            Some(provider) => format!("no key: beesto key {} <your-key>", provider.id()),
            None => String::new(),
        };
        println!("{} · {} ({status})", group.name, group.tagline);

        for model in &group.models {
            let marker = if model.id == selected.id { "▶" } else { "•" };
            let mut tags = Vec::new();
            if model.supports_vision {
                tags.push("vision");
            }
            if model.is_fast {
                tags.push("fast");
            }
            let tags = if tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", tags.join(", "))
            };
            println!("  {marker} {} ({}){tags}", model.display_name, model.id);
        }
    }

    println!();
    println!(
        "🎯 Selected: {} ({}) via {}",
        selected.display_name,
        selected.id,
        selected.provider.display_name()
    );
}
