//! Annotated bytecode items
//!
//! The emitter hands the optimizer a linear stream of annotated items: real
//! instructions with typed arguments, label markers, and local-variable
//! declarations carried for the debugger. Items keep their source location
//! packed inline so rewrites can move provenance around without chasing
//! references.

use std::fmt;

use smallvec::SmallVec;

use crate::opcodes::{ArgKind, Opcode};

/// A source position attached to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Index into the emitter's file table
    pub file: u32,
    pub line: u32,
    pub column: u16,
}

/// A reference descriptor naming a storage location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    /// The src object of the procedure
    Src,
    /// The usr object of the procedure
    Usr,
    /// The object the procedure runs on
    SelfRef,
    /// The argument list object
    Args,
    /// The world singleton
    World,
    /// Local variable slot
    Local(u16),
    /// Procedure argument slot
    Argument(u16),
    /// Global variable slot
    Global(u16),
    /// Field of the object on the stack, by string-table index
    Field(u32),
    /// Field of src, by string-table index
    SrcField(u32),
    /// Index into the list on the stack
    ListIndex,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Src => write!(f, "src"),
            Self::Usr => write!(f, "usr"),
            Self::SelfRef => write!(f, "self"),
            Self::Args => write!(f, "args"),
            Self::World => write!(f, "world"),
            Self::Local(slot) => write!(f, "local({slot})"),
            Self::Argument(slot) => write!(f, "arg({slot})"),
            Self::Global(slot) => write!(f, "global({slot})"),
            Self::Field(idx) => write!(f, "field(s{idx})"),
            Self::SrcField(idx) => write!(f, "src.field(s{idx})"),
            Self::ListIndex => write!(f, "list_index"),
        }
    }
}

/// A typed instruction argument
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Integer(i32),
    Float(f32),
    /// String-table index
    String(u32),
    /// Resource-table index
    Resource(u32),
    /// Type id from the object tree
    TypeId(u32),
    Reference(Reference),
    /// Jump target label name
    Label(String),
    /// Operand count for variadic instructions
    ListSize(u32),
}

impl Operand {
    /// The schema kind of this operand
    pub fn kind(&self) -> ArgKind {
        match self {
            Self::Integer(_) => ArgKind::Integer,
            Self::Float(_) => ArgKind::Float,
            Self::String(_) => ArgKind::String,
            Self::Resource(_) => ArgKind::Resource,
            Self::TypeId(_) => ArgKind::TypeId,
            Self::Reference(_) => ArgKind::Reference,
            Self::Label(_) => ArgKind::Label,
            Self::ListSize(_) => ArgKind::ListSize,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(idx) => write!(f, "s{idx}"),
            Self::Resource(idx) => write!(f, "res{idx}"),
            Self::TypeId(id) => write!(f, "t{id}"),
            Self::Reference(r) => write!(f, "{r}"),
            Self::Label(name) => write!(f, "{name}"),
            Self::ListSize(n) => write!(f, "#{n}"),
        }
    }
}

/// An instruction with typed arguments and optional annotations
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub args: SmallVec<[Operand; 4]>,
    pub location: Option<SourceLocation>,
    /// Stack-depth change recorded by the emitter, when it knows better
    /// than the opcode-level hint (calls, prompts)
    pub stack_delta: Option<i32>,
}

impl Instruction {
    /// Create an instruction with no arguments
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            args: SmallVec::new(),
            location: None,
            stack_delta: None,
        }
    }

    /// Create an instruction with the given arguments
    pub fn with_args(opcode: Opcode, args: impl IntoIterator<Item = Operand>) -> Self {
        Self {
            opcode,
            args: args.into_iter().collect(),
            location: None,
            stack_delta: None,
        }
    }

    /// Attach a source location
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Read the label name at the given argument index.
    ///
    /// Panics if the operand is not a label; a mismatch is a bug in either
    /// the rewrite catalog or the emitter's argument schemas, never a
    /// recoverable condition.
    pub fn label_arg(&self, idx: usize) -> &str {
        match self.args.get(idx) {
            Some(Operand::Label(name)) => name,
            other => panic!(
                "{}: argument {idx} is {other:?}, expected a label",
                self.opcode
            ),
        }
    }

    /// Read the operand count at the given argument index; panics on mismatch
    pub fn list_size_arg(&self, idx: usize) -> u32 {
        match self.args.get(idx) {
            Some(Operand::ListSize(n)) => *n,
            other => panic!(
                "{}: argument {idx} is {other:?}, expected a list size",
                self.opcode
            ),
        }
    }

    /// Net stack-depth change of this instruction.
    ///
    /// Prefers the emitter's `stack_delta` annotation; otherwise corrects the
    /// opcode-level hint for the operand-count-dependent families.
    pub fn stack_effect(&self) -> i32 {
        if let Some(delta) = self.stack_delta {
            return delta;
        }
        match self.opcode {
            Opcode::PushNFloats
            | Opcode::PushNStrings
            | Opcode::PushNRefs
            | Opcode::PushNResources => self.list_size_arg(0) as i32,
            Opcode::PushNOfStringFloats => 2 * self.list_size_arg(0) as i32,
            Opcode::CreateList | Opcode::CreateMultidimensionalList => {
                1 - self.list_size_arg(0) as i32
            }
            Opcode::CreateAssociativeList => 1 - 2 * self.list_size_arg(0) as i32,
            Opcode::FormatString => 1 - self.list_size_arg(1) as i32,
            Opcode::MassConcatenation
            | Opcode::PickUnweighted
            | Opcode::Prompt
            | Opcode::Rgb
            | Opcode::Gradient => 1 - self.list_size_arg(0) as i32,
            Opcode::PickWeighted => 1 - 2 * self.list_size_arg(0) as i32,
            Opcode::Call => 1 - self.list_size_arg(1) as i32,
            Opcode::CallStatement => -(self.list_size_arg(1) as i32),
            Opcode::DereferenceCall => -(self.list_size_arg(1) as i32),
            Opcode::CreateObject => 1 - self.list_size_arg(1) as i32,
            _ => self.opcode.stack_effect(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A jump target marker
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    pub location: Option<SourceLocation>,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }
}

/// A local-variable declaration carried for the debugger.
///
/// Semantically inert; every transformation passes it through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub name: String,
    pub location: Option<SourceLocation>,
}

impl LocalVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }
}

/// One element of the annotated bytecode stream
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotatedItem {
    Instruction(Instruction),
    Label(Label),
    LocalVariable(LocalVariable),
}

impl AnnotatedItem {
    /// Shorthand for an argument-less instruction item
    pub fn instr(opcode: Opcode) -> Self {
        Self::Instruction(Instruction::new(opcode))
    }

    /// Shorthand for an instruction item with arguments
    pub fn instr_args(opcode: Opcode, args: impl IntoIterator<Item = Operand>) -> Self {
        Self::Instruction(Instruction::with_args(opcode, args))
    }

    /// Shorthand for a label item
    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(Label::new(name))
    }

    pub fn is_instruction(&self) -> bool {
        matches!(self, Self::Instruction(_))
    }

    /// The opcode, when this item is an instruction
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Self::Instruction(instr) => Some(instr.opcode),
            _ => None,
        }
    }

    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Self::Instruction(instr) => Some(instr),
            _ => None,
        }
    }

    pub fn as_instruction_mut(&mut self) -> Option<&mut Instruction> {
        match self {
            Self::Instruction(instr) => Some(instr),
            _ => None,
        }
    }

    /// The source location packed into this item
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::Instruction(instr) => instr.location,
            Self::Label(label) => label.location,
            Self::LocalVariable(var) => var.location,
        }
    }

    /// Overwrite the source location packed into this item
    pub fn set_location(&mut self, location: Option<SourceLocation>) {
        match self {
            Self::Instruction(instr) => instr.location = location,
            Self::Label(label) => label.location = location,
            Self::LocalVariable(var) => var.location = location,
        }
    }
}

impl From<Instruction> for AnnotatedItem {
    fn from(instr: Instruction) -> Self {
        Self::Instruction(instr)
    }
}

impl fmt::Display for AnnotatedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruction(instr) => write!(f, "  {instr}"),
            Self::Label(label) => write!(f, "{}:", label.name),
            Self::LocalVariable(var) => write!(f, "  ; local {}", var.name),
        }
    }
}
