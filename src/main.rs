use std::{env, fs, process};

use streamvm::logging::{banner, error};
use streamvm::vm::StreamVm;

const DEMO_SIMPLE: &str = r#"
OPEN "Trailer 1"
PLAY 1
WAIT 5
PAUSE
HALT
"#;

const DEMO_CONDITIONAL: &str = r#"
OPEN "Demo Video"
PLAY 1

loop:
    WAIT 1
    GET_POS
    PUSH 30
    LT              ; 1 if pos < 30, else 0
    JUMPI loop      ; keep playing while pos < 30

PAUSE
PRINTS "Reached 30 seconds!"
HALT
"#;

const DEMO_ARITHMETIC: &str = r#"
OPEN "Tutorial"
PLAY 1
WAIT 10

; Stash the position in memory
GET_POS
STORE 0         ; memory[0] = position

; Add 20 seconds
LOAD 0
PUSH 20
ADD
POP R0          ; R0 = position + 20

; Seek to the new position
PUSH R0
POP R0
SEEK 30

HALT
"#;

const DEMO_DECJZ: &str = r#"
; Count down from 5 using DECJZ
PUSH 5
POP R0

countdown:
    PUSH R0
    PRINT
    DECJZ R0 done
    GOTO countdown

done:
    PRINTS "Countdown finished!"
    HALT
"#;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [program.asm]", args[0]);
        process::exit(1);
    }

    match args.get(1) {
        Some(path) => {
            let source = fs::read_to_string(path).unwrap_or_else(|e| {
                error(&format!("failed to read {}: {}", path, e));
                process::exit(1);
            });
            banner(&format!("Loading program from {}", path));
            run_program(&source);
        }
        None => {
            let demos = [
                ("Demo 1: Simple playback", DEMO_SIMPLE),
                ("Demo 2: Conditional loop", DEMO_CONDITIONAL),
                ("Demo 3: Register arithmetic", DEMO_ARITHMETIC),
                ("Demo 4: DECJZ countdown", DEMO_DECJZ),
            ];
            for (title, source) in demos {
                banner(title);
                run_program(source);
                println!();
            }
        }
    }
}

/// Run a program on a fresh machine and print the final state
fn run_program(source: &str) {
    let mut vm = StreamVm::new();
    vm.load_program(source).unwrap_or_else(|e| {
        error(&e.to_string());
        process::exit(2);
    });
    vm.run().unwrap_or_else(|e| {
        error(&e.to_string());
        process::exit(3);
    });
    println!("Final state: {}", vm.state());
}
