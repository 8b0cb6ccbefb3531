//! List commands implementation

use crate::buses;

/// List all supported bus backends
pub fn list_buses() {
    let buses = buses::available_buses();

    println!("Supported buses:");
    println!();
    if buses.is_empty() {
        println!("  (none - recompile with backend features enabled)");
        return;
    }

    for b in &buses {
        println!("  {:10} - {}", b.name, b.description);
        if !b.aliases.is_empty() {
            println!("  {:10}   aliases: {}", "", b.aliases.join(", "));
        }
        if b.requires_root {
            println!("  {:10}   requires root", "");
        }
    }
}
