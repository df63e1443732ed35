//! Interactive check of note resolution and two-hand arbitration.

use finger_count::FingerCount;
use note_table::{arbitrate, NoteTable};
use std::io::{self, Write};

fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              Hand Piano Note Table                   ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let table = NoteTable::standard();
    print_table(&table);

    loop {
        let line = read_line("Right and left finger counts (e.g. \"3 2\", q to quit): ");
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") || line.is_empty() {
            println!("\nGoodbye!\n");
            break;
        }

        let mut parts = line.split_whitespace().map(|s| s.parse::<u8>().unwrap_or(0));
        let right = parts.next().unwrap_or(0);
        let left  = parts.next().unwrap_or(0);

        let solo = table.resolve(right);
        println!("  Single (right only) : {:<16} {}",
                 solo.to_string(), table.name_of(solo).unwrap_or("-"));

        let frame = arbitrate(&table, FingerCount::new(left), FingerCount::new(right));
        println!("  Cooperative         : {:<16} {} [{}]",
                 frame.note.to_string(),
                 table.name_of(frame.note).unwrap_or("-"),
                 frame.role.name());
        println!();
    }
}

fn print_table(table: &NoteTable) {
    println!("  ┌───────┬──────┬───────┬────────┐");
    println!("  │ Index │ Name │ Pitch │   Hz   │");
    println!("  ├───────┼──────┼───────┼────────┤");
    for e in table.entries() {
        println!("  │ {:>5} │ {:<4} │ {:<5} │ {:>6} │", e.index, e.name, e.pitch, e.frequency);
    }
    println!("  └───────┴──────┴───────┴────────┘");
    println!();
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
