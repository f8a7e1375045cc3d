//! `rolecast roles`: describe the demo context's role schema.

use rolecast_config::AppConfig;
use rolecast_core::RoleKey;

use crate::bank;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let transfer = bank::money_transfer(config.runtime.reentrancy)?;

    println!("🎭 Context: {}", transfer.name());
    println!("==================");
    for role in transfer.roles() {
        let mates: Vec<&str> = role.mates().iter().map(RoleKey::as_str).collect();
        let methods = role.method_names();
        println!("  Role {}", role.key());
        println!(
            "    methods: {}",
            if methods.is_empty() { "(none)".to_string() } else { methods.join(", ") }
        );
        println!("    mates:   {}", mates.join(", "));
    }

    let interactions: Vec<&str> = transfer.interactions().collect();
    println!("  Interactions: {}", interactions.join(", "));
    println!("  Reentrancy:   {}", transfer.reentrancy());

    Ok(())
}
