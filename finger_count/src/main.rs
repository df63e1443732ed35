//! Interactive menu for building synthetic hand poses, checking the finger
//! count, and printing the pose as a JSON landmark line that `hand_piano
//! --input` accepts.

use finger_count::{
    count_fingers, extended_fingers, Finger, HandFrame, HandPose, Handedness,
};
use std::io::{self, Write};

fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            Finger Count Pose Explorer                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut handedness = Handedness::Right;
    let mut pose = HandPose::FIST;
    let mut frame = HandFrame::empty();

    loop {
        print_menu(handedness, &pose);
        let raw = read_line("Command: ");
        if is_quit(&raw) {
            println!("\nGoodbye!\n");
            break;
        }
        let choice = raw.trim().to_ascii_lowercase();

        match choice.as_str() {
            "h" => {
                handedness = handedness.opposite();
                println!("  Hand is now {}.", handedness);
            }
            "t" | "i" | "m" | "r" | "p" => {
                let digit = match choice.as_str() {
                    "t" => 0,
                    "i" => 1,
                    "m" => 2,
                    "r" => 3,
                    _   => 4,
                };
                pose.toggle(digit);
            }
            "n" => {
                let n: u8 = read_line("  Show how many fingers (0–5)? ")
                    .trim().parse().unwrap_or(0);
                pose = HandPose::with_count(n);
            }
            "c" => {
                let obs = pose.observe(handedness);
                let flags = extended_fingers(&obs);
                for (finger, ext) in Finger::ALL.iter().zip(flags.iter()) {
                    println!("    {:<7} {}", finger.name(), if *ext { "extended" } else { "folded" });
                }
                println!("  Count: {}", count_fingers(&obs));
            }
            "a" => {
                frame.hands.retain(|h| h.handedness() != handedness);
                frame.hands.push(pose.observe(handedness));
                println!("  Frame now holds {} hand(s).", frame.len());
            }
            "j" => match serde_json::to_string(&frame) {
                Ok(line) => println!("{}", line),
                Err(e)   => println!("  ⚠  {}", e),
            },
            "x" => {
                frame = HandFrame::empty();
                println!("  Frame cleared.");
            }
            _ => println!("  ⚠  Unknown command."),
        }
        println!();
    }
}

fn print_menu(handedness: Handedness, pose: &HandPose) {
    let marks: String = pose.extended.iter()
        .map(|&e| if e { '|' } else { '.' })
        .collect();
    println!("  {} hand  [{}]  (thumb → pinky)", handedness, marks);
    println!("  ┌──────────────────────────────────────────────────────┐");
    println!("  │  h. Switch hand           c. Count fingers            │");
    println!("  │  t/i/m/r/p. Toggle digit  a. Add pose to frame        │");
    println!("  │  n. Show N fingers        j. Print frame as JSON      │");
    println!("  │                           x. Clear frame   q. Quit    │");
    println!("  └──────────────────────────────────────────────────────┘");
}

/// `q`, `quit`, or end of input (a read that returns nothing at all, not
/// even a newline).
fn is_quit(raw: &str) -> bool {
    raw.is_empty() || matches!(raw.trim().to_ascii_lowercase().as_str(), "q" | "quit")
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_of_input_quits() {
        assert!(is_quit(""));
        assert!(is_quit("q\n"));
        assert!(is_quit(" QUIT \r\n"));
    }

    #[test]
    fn blank_line_is_not_quit() {
        assert!(!is_quit("\n"));
        assert!(!is_quit("c\n"));
    }
}
