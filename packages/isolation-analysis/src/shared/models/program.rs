//! Program model
//!
//! A whole-program view with just enough structure for the isolation pass:
//! functions with an entry block, instructions tagged with front-end marks,
//! and the pointer values the points-to oracle is queried with.
//!
//! `Program` deserializes from a flat [`ProgramData`] and builds its lookup
//! indices on the way in, rejecting dangling function references and
//! duplicate ids.

use super::ids::{BlockId, FunctionId, InstId, ObjectId, ValueId};
use crate::errors::{InvariantViolation, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    pub entry_block: BlockId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallTarget {
    Direct(FunctionId),
    Indirect,
}

impl CallTarget {
    pub fn callee(&self) -> Option<FunctionId> {
        match self {
            CallTarget::Direct(f) => Some(*f),
            CallTarget::Indirect => None,
        }
    }
}

/// How control returns from a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallFlavor {
    /// Falls through to the next instruction
    #[default]
    Plain,
    /// Continues at `normal_dest` on normal return; unwinds elsewhere
    Invoke { normal_dest: BlockId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum InstKind {
    Call {
        target: CallTarget,
        #[serde(default)]
        flavor: CallFlavor,
    },
    Alloca,
    Store {
        pointer: ValueId,
        #[serde(default)]
        pointer_is_global: bool,
    },
    GetElementPtr,
    Load,
    Other,
}

/// Front-end annotation on an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    /// The value crosses the safe/unsafe boundary (taint source)
    BoundaryCrossing,
    /// Stack slot intentionally owned by the managed smart-pointer API
    SmartPointer,
    /// Address computation of a smart-pointer shadow field
    SmartPointerShadow,
    /// Dummy load inserted by the front end to keep a value alive
    MarkerLoad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstId,
    pub function: FunctionId,
    pub block: BlockId,
    pub kind: InstKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Instruction {
    pub fn has_mark(&self, mark: Mark) -> bool {
        self.marks.contains(&mark)
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, InstKind::Call { .. })
    }
}

/// View of a call instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub id: InstId,
    pub function: FunctionId,
    pub block: BlockId,
    pub target: CallTarget,
    pub flavor: CallFlavor,
}

impl CallSite {
    pub fn callee(&self) -> Option<FunctionId> {
        self.target.callee()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerValue {
    pub id: ValueId,
    /// Defining instruction; `None` for arguments and constants
    #[serde(default)]
    pub defined_by: Option<InstId>,
    /// Instructions that use the value directly
    #[serde(default)]
    pub users: Vec<InstId>,
    /// Top-level (register) pointer; only these are analyzable
    #[serde(default = "default_top_level")]
    pub top_level: bool,
}

fn default_top_level() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MemoryObjectKind {
    Stack { alloca: InstId },
    Heap,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryObject {
    pub id: ObjectId,
    #[serde(flatten)]
    pub kind: MemoryObjectKind,
}

impl MemoryObject {
    pub fn stack_alloca(&self) -> Option<InstId> {
        match self.kind {
            MemoryObjectKind::Stack { alloca } => Some(alloca),
            _ => None,
        }
    }
}

/// Serialized form of a [`Program`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramData {
    pub functions: Vec<Function>,
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub pointer_values: Vec<PointerValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ProgramData", into = "ProgramData")]
pub struct Program {
    functions: Vec<Function>,
    instructions: Vec<Instruction>,
    pointer_values: Vec<PointerValue>,
    function_index: FxHashMap<FunctionId, usize>,
    instruction_index: FxHashMap<InstId, usize>,
}

impl Program {
    pub fn new(data: ProgramData) -> Result<Self> {
        let ProgramData {
            functions,
            instructions,
            pointer_values,
        } = data;

        let mut function_index = FxHashMap::default();
        for (i, function) in functions.iter().enumerate() {
            if function_index.insert(function.id, i).is_some() {
                return Err(InvariantViolation::DuplicateId {
                    kind: "function",
                    id: function.id.raw(),
                }
                .into());
            }
        }

        let mut instruction_index = FxHashMap::default();
        for (i, inst) in instructions.iter().enumerate() {
            if !function_index.contains_key(&inst.function) {
                return Err(InvariantViolation::UnknownFunction(inst.function).into());
            }
            if instruction_index.insert(inst.id, i).is_some() {
                return Err(InvariantViolation::DuplicateId {
                    kind: "instruction",
                    id: inst.id.raw(),
                }
                .into());
            }
        }

        Ok(Self {
            functions,
            instructions,
            pointer_values,
            function_index,
            instruction_index,
        })
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn pointer_values(&self) -> &[PointerValue] {
        &self.pointer_values
    }

    pub fn function(&self, id: FunctionId) -> Result<&Function> {
        self.function_index
            .get(&id)
            .map(|&i| &self.functions[i])
            .ok_or_else(|| InvariantViolation::UnknownFunction(id).into())
    }

    pub fn instruction(&self, id: InstId) -> Result<&Instruction> {
        self.find_instruction(id)
            .ok_or_else(|| InvariantViolation::UnknownInstruction(id).into())
    }

    pub fn find_instruction(&self, id: InstId) -> Option<&Instruction> {
        self.instruction_index.get(&id).map(|&i| &self.instructions[i])
    }

    /// Resolve `id` as a call site
    pub fn call_site(&self, id: InstId) -> Result<CallSite> {
        let inst = self.instruction(id)?;
        match inst.kind {
            InstKind::Call { target, flavor } => Ok(CallSite {
                id,
                function: inst.function,
                block: inst.block,
                target,
                flavor,
            }),
            _ => Err(InvariantViolation::NotACallSite(id).into()),
        }
    }

    pub fn instructions_with_mark(&self, mark: Mark) -> impl Iterator<Item = &Instruction> + '_ {
        self.instructions.iter().filter(move |inst| inst.has_mark(mark))
    }
}

impl TryFrom<ProgramData> for Program {
    type Error = crate::errors::AnalysisError;

    fn try_from(data: ProgramData) -> Result<Self> {
        Program::new(data)
    }
}

impl From<Program> for ProgramData {
    fn from(program: Program) -> Self {
        ProgramData {
            functions: program.functions,
            instructions: program.instructions,
            pointer_values: program.pointer_values,
        }
    }
}
