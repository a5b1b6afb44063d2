//! Decoding lexed statements into instructions

use super::statement::Statement;
use crate::assembler::Instr;

/// Decode one statement into an instruction.
///
/// Decoding never fails: argument lexemes are carried raw for the
/// interpreter to resolve, extra arguments are ignored as the dialect
/// tolerates them, and an unrecognized mnemonic becomes
/// [`Instr::Unknown`], which traps only if it is ever dispatched.
pub fn decode(statement: &Statement) -> Instr {
    match statement.opcode().to_uppercase().as_str() {
        "PUSH"        => Instr::Push(statement.argument(0)),
        "POP"         => Instr::Pop(statement.argument(0)),
        "LOAD"        => Instr::Load(statement.argument(0)),
        "STORE"       => Instr::Store(statement.argument(0)),
        "ADD"         => Instr::Add,
        "SUB"         => Instr::Sub,
        "MUL"         => Instr::Mul,
        "DIV"         => Instr::Div,
        "NEG"         => Instr::Neg,
        "EQ"          => Instr::Eq,
        "NE"          => Instr::Ne,
        "LT"          => Instr::Lt,
        "LE"          => Instr::Le,
        "GT"          => Instr::Gt,
        "GE"          => Instr::Ge,
        "GOTO"        => Instr::Goto(statement.argument(0)),
        "JUMPZ"       => Instr::Jumpz(statement.argument(0)),
        "JUMPI"       => Instr::Jumpi(statement.argument(0)),
        "DECJZ"       => Instr::Decjz(statement.argument(0), statement.argument(1)),
        "OPEN"        => Instr::Open(statement.argument(0)),
        "PLAY"        => Instr::Play(statement.opt_argument(0)),
        "PAUSE"       => Instr::Pause,
        "STOP"        => Instr::Stop,
        "SEEK"        => Instr::Seek(statement.argument(0)),
        "FORWARD"     => Instr::Forward(statement.argument(0)),
        "REWIND"      => Instr::Rewind(statement.argument(0)),
        "WAIT"        => Instr::Wait(statement.argument(0)),
        "GET_POS"     => Instr::GetPos,
        "GET_DUR"     => Instr::GetDur,
        "GET_ENDED"   => Instr::GetEnded,
        "GET_PLAYING" => Instr::GetPlaying,
        "PRINT"       => Instr::Print,
        "PRINTS"      => Instr::Prints(statement.argument(0)),
        "HALT"        => Instr::Halt,
        unknown       => Instr::Unknown(unknown.to_string()),
    }
}
