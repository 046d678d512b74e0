use colored::*;
use talon_library::drivers::AVAILABLE_BACKENDS;

pub fn run_backends() {
    println!("{}", "Talon transport backends".cyan().bold());
    for backend in AVAILABLE_BACKENDS {
        let note = match *backend {
            "simulation" => "in-memory Talon SRX with a motor model (alias: sim)",
            _ => "",
        };
        println!("  {} {} {}", "-".green(), backend.bold(), note.dimmed());
    }
}
