//! Shared models

mod ids;
mod program;

pub use ids::{BlockId, FunctionId, InstId, ObjectId, ValueId};
pub use program::{
    CallFlavor, CallSite, CallTarget, Function, InstKind, Instruction, Mark, MemoryObject,
    MemoryObjectKind, PointerValue, Program, ProgramData,
};
