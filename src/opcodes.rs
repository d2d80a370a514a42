//! Opcodes for the annotated stack bytecode
//!
//! This module defines the closed opcode enumeration produced by the emitter
//! and consumed by the optimizer, together with the static metadata registry
//! that both the peephole rewriter and the CFG builder query: whether an
//! opcode ends a basic block, its stack-effect hint, and its argument schema.
//!
//! Opcodes are grouped by category. The fused superinstructions produced by
//! the peephole rewriter (`PushNFloats`, `AssignPop`, `SwitchOnFloat`, ...)
//! live alongside the plain forms; the emitter never produces them directly.

use std::fmt;

/// The kind of a typed instruction argument.
///
/// Argument schemas are declared per opcode; the variadic push/list families
/// declare their leading `ListSize` count and repeat their element kind that
/// many times after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// Signed integer immediate
    Integer,
    /// 32-bit float immediate
    Float,
    /// Index into the string table
    String,
    /// Index into the resource table
    Resource,
    /// Type id from the object tree
    TypeId,
    /// Reference descriptor (local, global, field, ...)
    Reference,
    /// Jump target label name
    Label,
    /// Operand count for variadic instructions
    ListSize,
}

/// Bytecode opcode enumeration
///
/// Each opcode names one operation of the register-free stack machine. The
/// enumeration is closed: adding an opcode without extending the metadata
/// match arms is a compile error, which is what keeps the control-flow
/// classification total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // === Stack and constants ===
    /// Push null
    PushNull,
    /// Push a float immediate
    PushFloat,
    /// Push a string by string-table index
    PushString,
    /// Push a resource by resource-table index
    PushResource,
    /// Push a type id
    PushType,
    /// Push a proc reference
    PushProc,
    /// Push the global variable table
    PushGlobalVars,
    /// Push the value read through a reference
    PushReferenceValue,
    /// Pop a list and spread it as call arguments
    PushArgumentList,
    /// Interpolate N stack values into a format string
    FormatString,
    /// Fused: push one string then one float
    PushStringFloat,
    /// Fused: push N float immediates
    PushNFloats,
    /// Fused: push N strings
    PushNStrings,
    /// Fused: push N reference values
    PushNRefs,
    /// Fused: push N resources
    PushNResources,
    /// Fused: push N string/float pairs
    PushNOfStringFloats,
    /// Discard top of stack
    Pop,
    /// Pop into a reference without reading it back
    PopReference,
    /// Fused: write null through a reference, no stack traffic
    NullRef,

    // === Assignment ===
    /// Write TOS through a reference, leaving the value on the stack
    Assign,
    /// Fused: write TOS through a reference and pop it
    AssignPop,
    /// `+=` through a reference
    Append,
    /// `-=` through a reference
    Remove,
    /// `|=` through a reference
    Combine,
    /// `&=` through a reference
    Mask,
    /// `++` through a reference, pushing the updated value
    Increment,
    /// `--` through a reference, pushing the updated value
    Decrement,
    /// `+=` through a reference without pushing the result
    AppendNoPush,

    // === Arithmetic ===
    /// Addition (also string concatenation)
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    /// Wrapping modulus `%%`
    ModulusModulus,
    Power,
    Negate,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    BitShiftLeft,
    BitShiftRight,

    // === Reference-augmented arithmetic ===
    /// `*=` through a reference, pushing the result
    MultiplyReference,
    /// `/=` through a reference, pushing the result
    DivideReference,
    /// `%=` through a reference, pushing the result
    ModulusReference,
    /// `%%=` through a reference, pushing the result
    ModulusModulusReference,
    /// `^=` through a reference, pushing the result
    BitXorReference,
    /// `<<=` through a reference, pushing the result
    BitShiftLeftReference,
    /// `>>=` through a reference, pushing the result
    BitShiftRightReference,

    // === Comparison ===
    CompareEquals,
    CompareNotEquals,
    CompareLessThan,
    CompareGreaterThan,
    CompareLessThanOrEqual,
    CompareGreaterThanOrEqual,
    /// Structural equivalence `~=`
    CompareEquivalent,
    /// Structural non-equivalence `~!`
    CompareNotEquivalent,

    // === Boolean and control flow ===
    BooleanNot,
    /// Short-circuit and: jump to the label if TOS is falsy, else pop it
    BooleanAnd,
    /// Short-circuit or: jump to the label if TOS is truthy, else pop it
    BooleanOr,
    /// Unconditional jump
    Jump,
    /// Pop TOS, jump if falsy
    JumpIfFalse,
    /// Pop TOS, jump if truthy
    JumpIfTrue,
    /// Pop TOS, jump if null
    JumpIfNull,
    /// Jump if TOS is null, keeping it on the stack
    JumpIfNullNoPop,
    /// Fused: jump if the value behind a reference is falsy
    JumpIfReferenceFalse,
    /// Fused: jump if the value behind a reference is truthy
    JumpIfReferenceTrue,
    /// Pop a case value, jump if it matches the switch value
    SwitchCase,
    /// Pop range bounds, jump if the switch value falls inside
    SwitchCaseRange,
    /// Fused: switch case with an inline float constant
    SwitchOnFloat,
    /// Fused: switch case with an inline string constant
    SwitchOnString,
    /// Return TOS from the procedure
    Return,
    /// Pop TOS and throw it
    Throw,
    /// Pop a delay and fork execution at the label
    Spawn,
    /// Enter a try region whose catch target is the label
    Try,
    /// Enter a try region that discards the caught value
    TryNoValue,
    /// Leave the innermost try region
    EndTry,

    // === Calls ===
    /// Call through a reference with N stacked arguments, pushing the result
    Call,
    /// Call through a reference, discarding the result
    CallStatement,
    /// Pop an object, call the named proc on it with N stacked arguments
    DereferenceCall,

    // === Dereference ===
    /// Pop an object, push the named field
    DereferenceField,
    /// Pop an index and an object, push the element
    DereferenceIndex,
    /// Fused: push a reference's value then dereference a field on it
    PushRefAndDereferenceField,

    // === Objects and lists ===
    /// Pop a type and N stacked arguments, push the new object
    CreateObject,
    /// Pop an object and delete it
    DeleteObject,
    /// Pop K stacked values into a fresh list
    CreateList,
    /// Pop K key/value pairs into a fresh associative list
    CreateAssociativeList,
    /// Fused: build a list from N inline floats
    CreateListNFloats,
    /// Fused: build a list from N inline strings
    CreateListNStrings,
    /// Fused: build a list from N inline resources
    CreateListNResources,
    /// Fused: build a list from N inline reference values
    CreateListNRefs,
    /// Pop K dimension sizes into a fresh nested list
    CreateMultidimensionalList,
    /// Pop a list and a value, push whether the value is in the list
    IsInList,
    /// Pop high, low and a value, push whether the value is in range
    IsInRange,

    // === Enumeration ===
    /// Pop a list and open an enumerator over it
    CreateListEnumerator,
    /// Pop a list and open an enumerator filtered to a type
    CreateFilteredListEnumerator,
    /// Open an enumerator over all instances of a type
    CreateTypeEnumerator,
    /// Pop start, end and step and open a range enumerator
    CreateRangeEnumerator,
    /// Advance the enumerator into a reference, jump to the label when done
    Enumerate,
    /// Advance the enumerator without binding, jump to the label when done
    EnumerateNoAssign,
    /// Close the innermost enumerator
    DestroyEnumerator,

    // === Types ===
    /// Pop a type and a value, push whether the value is of the type
    IsType,
    /// Fused: istype with an inline type id
    IsTypeDirect,
    /// Push whether TOS is null, popping it
    IsNull,
    /// Pop a type and a value, push the value cast to the type or null
    AsType,
    /// Push the compile-time initial value of a field
    Initial,
    /// Push whether a field is saved
    IsSaved,

    // === Math builtins ===
    Abs,
    Sqrt,
    Sin,
    Cos,
    Tan,
    ArcSin,
    ArcCos,
    ArcTan,
    /// Two-argument arctangent
    ArcTan2,
    Log,

    // === Strings ===
    /// Concatenate N stacked values into one string
    MassConcatenation,
    /// Pop a value, push its length
    Length,

    // === Randomness ===
    /// Pop a percentage, push a random success flag
    Prob,
    /// Pop N value/weight pairs, push a weighted pick
    PickWeighted,
    /// Pop N values, push a uniform pick
    PickUnweighted,

    // === World interaction ===
    /// Pop a receiver and a value, send the value to the receiver
    Output,
    /// Send TOS to the receiver behind a reference
    OutputReference,
    /// Pop a receiver and a control message
    OutputControl,
    /// Prompt for input; operands select the forms
    Input,
    /// Pop a receiver, body and options, open a browse window
    Browse,
    /// Pop a receiver, file and name, ship a resource
    BrowseResource,
    /// Prompt with N stacked option values
    Prompt,
    /// Pop a receiver and a URL, follow the link
    Link,
    /// Pop a receiver, file and name, offer a download
    Ftp,

    // === Atoms and movement ===
    /// Pop z, y and x, push the turf at the coordinate
    LocateCoord,
    /// Pop a container and a type, push the first match
    LocateRef,
    /// Pop a direction and an atom, push the adjacent location
    GetStep,
    /// Pop two atoms, push the direction between them
    GetDir,

    // === Misc ===
    /// Pop a delay and suspend the procedure
    Sleep,
    /// Pop N components, push a color string
    Rgb,
    /// Pop N stops, push an interpolated gradient value
    Gradient,
    /// Breakpoint for the debug server
    DebuggerBreakpoint,
}

/// Static metadata record for one opcode.
///
/// `stack_effect` is a hint: for the variadic families it covers only the
/// part that does not depend on the operand count (see
/// [`Instruction::stack_effect`](crate::item::Instruction::stack_effect)
/// for the corrected computation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeMetadata {
    /// True when the opcode must end its basic block
    pub splits_basic_block: bool,
    /// Net stack-depth change hint
    pub stack_effect: i32,
    /// Declared argument kinds (variadic tails repeat the element kind)
    pub arg_schema: &'static [ArgKind],
}

const NO_ARGS: &[ArgKind] = &[];
const FLOAT: &[ArgKind] = &[ArgKind::Float];
const STRING: &[ArgKind] = &[ArgKind::String];
const RESOURCE: &[ArgKind] = &[ArgKind::Resource];
const TYPE_ID: &[ArgKind] = &[ArgKind::TypeId];
const REFERENCE: &[ArgKind] = &[ArgKind::Reference];
const LABEL: &[ArgKind] = &[ArgKind::Label];
const LIST_SIZE: &[ArgKind] = &[ArgKind::ListSize];
const STRING_FLOAT: &[ArgKind] = &[ArgKind::String, ArgKind::Float];
const STRING_LIST_SIZE: &[ArgKind] = &[ArgKind::String, ArgKind::ListSize];
const FLOAT_LABEL: &[ArgKind] = &[ArgKind::Float, ArgKind::Label];
const STRING_LABEL: &[ArgKind] = &[ArgKind::String, ArgKind::Label];
const REF_LABEL: &[ArgKind] = &[ArgKind::Reference, ArgKind::Label];
const REF_STRING: &[ArgKind] = &[ArgKind::Reference, ArgKind::String];
const REF_LIST_SIZE: &[ArgKind] = &[ArgKind::Reference, ArgKind::ListSize];
const TYPE_LIST_SIZE: &[ArgKind] = &[ArgKind::TypeId, ArgKind::ListSize];
const INTEGER: &[ArgKind] = &[ArgKind::Integer];

impl Opcode {
    /// Check whether this opcode must be the last instruction of its block
    ///
    /// True for every conditional and unconditional jump, `Return`, `Throw`,
    /// `Spawn`, and the enumerate variants.
    #[inline]
    pub fn splits_basic_block(self) -> bool {
        matches!(
            self,
            Self::Jump
                | Self::JumpIfFalse
                | Self::JumpIfTrue
                | Self::JumpIfNull
                | Self::JumpIfNullNoPop
                | Self::JumpIfReferenceFalse
                | Self::JumpIfReferenceTrue
                | Self::BooleanAnd
                | Self::BooleanOr
                | Self::SwitchCase
                | Self::SwitchCaseRange
                | Self::SwitchOnFloat
                | Self::SwitchOnString
                | Self::Return
                | Self::Throw
                | Self::Spawn
                | Self::Enumerate
                | Self::EnumerateNoAssign
        )
    }

    /// Check if this opcode is a call
    #[inline]
    pub fn is_call(self) -> bool {
        matches!(self, Self::Call | Self::CallStatement | Self::DereferenceCall)
    }

    /// Net stack-depth change hint for this opcode
    pub fn stack_effect(self) -> i32 {
        match self {
            // Pushes
            Self::PushNull
            | Self::PushFloat
            | Self::PushString
            | Self::PushResource
            | Self::PushType
            | Self::PushProc
            | Self::PushGlobalVars
            | Self::PushReferenceValue
            | Self::PushRefAndDereferenceField
            | Self::Increment
            | Self::Decrement => 1,

            Self::PushStringFloat => 2,

            // Neutral
            Self::PushArgumentList
            | Self::NullRef
            | Self::PopReference
            | Self::Assign
            | Self::Negate
            | Self::BitNot
            | Self::BooleanNot
            | Self::Jump
            | Self::JumpIfNullNoPop
            | Self::JumpIfReferenceFalse
            | Self::JumpIfReferenceTrue
            | Self::SwitchOnFloat
            | Self::SwitchOnString
            | Self::Try
            | Self::TryNoValue
            | Self::EndTry
            | Self::Call
            | Self::CallStatement
            | Self::DereferenceCall
            | Self::DereferenceField
            | Self::MultiplyReference
            | Self::DivideReference
            | Self::ModulusReference
            | Self::ModulusModulusReference
            | Self::BitXorReference
            | Self::BitShiftLeftReference
            | Self::BitShiftRightReference
            | Self::CreateObject
            | Self::CreateTypeEnumerator
            | Self::DestroyEnumerator
            | Self::Enumerate
            | Self::EnumerateNoAssign
            | Self::IsTypeDirect
            | Self::IsNull
            | Self::Initial
            | Self::IsSaved
            | Self::Abs
            | Self::Sqrt
            | Self::Sin
            | Self::Cos
            | Self::Tan
            | Self::ArcSin
            | Self::ArcCos
            | Self::ArcTan
            | Self::Log
            | Self::Length
            | Self::Prob
            | Self::PickWeighted
            | Self::PickUnweighted
            | Self::Input
            | Self::Prompt
            | Self::Rgb
            | Self::Gradient
            | Self::DebuggerBreakpoint
            | Self::FormatString
            | Self::MassConcatenation
            | Self::CreateList
            | Self::CreateAssociativeList
            | Self::CreateMultidimensionalList => 0,

            // Single pop
            Self::Pop
            | Self::AssignPop
            | Self::Append
            | Self::AppendNoPush
            | Self::Remove
            | Self::Combine
            | Self::Mask
            | Self::Add
            | Self::Subtract
            | Self::Multiply
            | Self::Divide
            | Self::Modulus
            | Self::ModulusModulus
            | Self::Power
            | Self::BitAnd
            | Self::BitOr
            | Self::BitXor
            | Self::BitShiftLeft
            | Self::BitShiftRight
            | Self::CompareEquals
            | Self::CompareNotEquals
            | Self::CompareLessThan
            | Self::CompareGreaterThan
            | Self::CompareLessThanOrEqual
            | Self::CompareGreaterThanOrEqual
            | Self::CompareEquivalent
            | Self::CompareNotEquivalent
            | Self::BooleanAnd
            | Self::BooleanOr
            | Self::JumpIfFalse
            | Self::JumpIfTrue
            | Self::JumpIfNull
            | Self::SwitchCase
            | Self::Return
            | Self::Throw
            | Self::Spawn
            | Self::Sleep
            | Self::DeleteObject
            | Self::IsInList
            | Self::IsType
            | Self::AsType
            | Self::ArcTan2
            | Self::DereferenceIndex
            | Self::CreateListEnumerator
            | Self::CreateFilteredListEnumerator
            | Self::LocateRef
            | Self::GetStep
            | Self::GetDir
            | Self::OutputReference => -1,

            // Double pop
            Self::SwitchCaseRange
            | Self::IsInRange
            | Self::Output
            | Self::OutputControl
            | Self::Link
            | Self::LocateCoord => -2,

            Self::CreateRangeEnumerator | Self::Browse | Self::BrowseResource | Self::Ftp => -3,

            // Variadic pushes: +N (or +2N), counted from the ListSize operand
            Self::PushNFloats
            | Self::PushNStrings
            | Self::PushNRefs
            | Self::PushNResources
            | Self::PushNOfStringFloats => 0,

            // Fused list builders always net one list
            Self::CreateListNFloats
            | Self::CreateListNStrings
            | Self::CreateListNResources
            | Self::CreateListNRefs => 1,
        }
    }

    /// Declared argument schema for this opcode
    pub fn arg_schema(self) -> &'static [ArgKind] {
        match self {
            Self::PushFloat => FLOAT,
            Self::PushString | Self::DereferenceField => STRING,
            Self::PushResource => RESOURCE,
            Self::PushType
            | Self::IsTypeDirect
            | Self::CreateFilteredListEnumerator
            | Self::CreateTypeEnumerator => TYPE_ID,
            Self::PushProc
            | Self::PushReferenceValue
            | Self::PopReference
            | Self::NullRef
            | Self::Assign
            | Self::AssignPop
            | Self::Append
            | Self::AppendNoPush
            | Self::Remove
            | Self::Combine
            | Self::Mask
            | Self::Increment
            | Self::Decrement
            | Self::MultiplyReference
            | Self::DivideReference
            | Self::ModulusReference
            | Self::ModulusModulusReference
            | Self::BitXorReference
            | Self::BitShiftLeftReference
            | Self::BitShiftRightReference
            | Self::OutputReference
            | Self::Initial
            | Self::IsSaved => REFERENCE,
            Self::Jump
            | Self::JumpIfFalse
            | Self::JumpIfTrue
            | Self::JumpIfNull
            | Self::JumpIfNullNoPop
            | Self::BooleanAnd
            | Self::BooleanOr
            | Self::SwitchCase
            | Self::SwitchCaseRange
            | Self::Spawn
            | Self::Try
            | Self::TryNoValue
            | Self::EnumerateNoAssign => LABEL,
            Self::JumpIfReferenceFalse | Self::JumpIfReferenceTrue | Self::Enumerate => REF_LABEL,
            Self::SwitchOnFloat => FLOAT_LABEL,
            Self::SwitchOnString => STRING_LABEL,
            Self::PushStringFloat => STRING_FLOAT,
            Self::PushRefAndDereferenceField => REF_STRING,
            Self::FormatString => STRING_LIST_SIZE,
            Self::PushNFloats
            | Self::PushNStrings
            | Self::PushNRefs
            | Self::PushNResources
            | Self::PushNOfStringFloats
            | Self::CreateList
            | Self::CreateAssociativeList
            | Self::CreateListNFloats
            | Self::CreateListNStrings
            | Self::CreateListNResources
            | Self::CreateListNRefs
            | Self::CreateMultidimensionalList
            | Self::MassConcatenation
            | Self::PickWeighted
            | Self::PickUnweighted
            | Self::Prompt
            | Self::Rgb
            | Self::Gradient => LIST_SIZE,
            Self::Call | Self::CallStatement => REF_LIST_SIZE,
            Self::DereferenceCall => STRING_LIST_SIZE,
            Self::CreateObject => TYPE_LIST_SIZE,
            Self::Input => INTEGER,
            _ => NO_ARGS,
        }
    }

    /// Full metadata record for this opcode
    ///
    /// Total over the enumeration; exhaustiveness of the underlying matches
    /// is checked by the compiler.
    #[inline]
    pub fn metadata(self) -> OpcodeMetadata {
        OpcodeMetadata {
            splits_basic_block: self.splits_basic_block(),
            stack_effect: self.stack_effect(),
            arg_schema: self.arg_schema(),
        }
    }

    /// Get the mnemonic name for this opcode
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::PushNull => "push_null",
            Self::PushFloat => "push_float",
            Self::PushString => "push_string",
            Self::PushResource => "push_resource",
            Self::PushType => "push_type",
            Self::PushProc => "push_proc",
            Self::PushGlobalVars => "push_global_vars",
            Self::PushReferenceValue => "push_ref_value",
            Self::PushArgumentList => "push_argument_list",
            Self::FormatString => "format_string",
            Self::PushStringFloat => "push_string_float",
            Self::PushNFloats => "push_n_floats",
            Self::PushNStrings => "push_n_strings",
            Self::PushNRefs => "push_n_refs",
            Self::PushNResources => "push_n_resources",
            Self::PushNOfStringFloats => "push_n_string_floats",
            Self::Pop => "pop",
            Self::PopReference => "pop_ref",
            Self::NullRef => "null_ref",
            Self::Assign => "assign",
            Self::AssignPop => "assign_pop",
            Self::Append => "append",
            Self::Remove => "remove",
            Self::Combine => "combine",
            Self::Mask => "mask",
            Self::Increment => "increment",
            Self::Decrement => "decrement",
            Self::AppendNoPush => "append_no_push",
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Modulus => "modulus",
            Self::ModulusModulus => "modulus_modulus",
            Self::Power => "power",
            Self::Negate => "negate",
            Self::BitAnd => "bit_and",
            Self::BitOr => "bit_or",
            Self::BitXor => "bit_xor",
            Self::BitNot => "bit_not",
            Self::BitShiftLeft => "bit_shift_left",
            Self::BitShiftRight => "bit_shift_right",
            Self::MultiplyReference => "multiply_ref",
            Self::DivideReference => "divide_ref",
            Self::ModulusReference => "modulus_ref",
            Self::ModulusModulusReference => "modulus_modulus_ref",
            Self::BitXorReference => "bit_xor_ref",
            Self::BitShiftLeftReference => "bit_shift_left_ref",
            Self::BitShiftRightReference => "bit_shift_right_ref",
            Self::CompareEquals => "cmp_eq",
            Self::CompareNotEquals => "cmp_ne",
            Self::CompareLessThan => "cmp_lt",
            Self::CompareGreaterThan => "cmp_gt",
            Self::CompareLessThanOrEqual => "cmp_le",
            Self::CompareGreaterThanOrEqual => "cmp_ge",
            Self::CompareEquivalent => "cmp_equiv",
            Self::CompareNotEquivalent => "cmp_nequiv",
            Self::BooleanNot => "bool_not",
            Self::BooleanAnd => "bool_and",
            Self::BooleanOr => "bool_or",
            Self::Jump => "jump",
            Self::JumpIfFalse => "jump_if_false",
            Self::JumpIfTrue => "jump_if_true",
            Self::JumpIfNull => "jump_if_null",
            Self::JumpIfNullNoPop => "jump_if_null_no_pop",
            Self::JumpIfReferenceFalse => "jump_if_ref_false",
            Self::JumpIfReferenceTrue => "jump_if_ref_true",
            Self::SwitchCase => "switch_case",
            Self::SwitchCaseRange => "switch_case_range",
            Self::SwitchOnFloat => "switch_on_float",
            Self::SwitchOnString => "switch_on_string",
            Self::Return => "return",
            Self::Throw => "throw",
            Self::Spawn => "spawn",
            Self::Try => "try",
            Self::TryNoValue => "try_no_value",
            Self::EndTry => "end_try",
            Self::Call => "call",
            Self::CallStatement => "call_statement",
            Self::DereferenceCall => "deref_call",
            Self::DereferenceField => "deref_field",
            Self::DereferenceIndex => "deref_index",
            Self::PushRefAndDereferenceField => "push_ref_deref_field",
            Self::CreateObject => "create_object",
            Self::DeleteObject => "delete_object",
            Self::CreateList => "create_list",
            Self::CreateAssociativeList => "create_assoc_list",
            Self::CreateListNFloats => "create_list_n_floats",
            Self::CreateListNStrings => "create_list_n_strings",
            Self::CreateListNResources => "create_list_n_resources",
            Self::CreateListNRefs => "create_list_n_refs",
            Self::CreateMultidimensionalList => "create_multidim_list",
            Self::IsInList => "is_in_list",
            Self::IsInRange => "is_in_range",
            Self::CreateListEnumerator => "create_list_enum",
            Self::CreateFilteredListEnumerator => "create_filtered_list_enum",
            Self::CreateTypeEnumerator => "create_type_enum",
            Self::CreateRangeEnumerator => "create_range_enum",
            Self::Enumerate => "enumerate",
            Self::EnumerateNoAssign => "enumerate_no_assign",
            Self::DestroyEnumerator => "destroy_enum",
            Self::IsType => "is_type",
            Self::IsTypeDirect => "is_type_direct",
            Self::IsNull => "is_null",
            Self::AsType => "as_type",
            Self::Initial => "initial",
            Self::IsSaved => "is_saved",
            Self::Abs => "abs",
            Self::Sqrt => "sqrt",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::ArcSin => "arcsin",
            Self::ArcCos => "arccos",
            Self::ArcTan => "arctan",
            Self::ArcTan2 => "arctan2",
            Self::Log => "log",
            Self::MassConcatenation => "mass_concat",
            Self::Length => "length",
            Self::Prob => "prob",
            Self::PickWeighted => "pick_weighted",
            Self::PickUnweighted => "pick_unweighted",
            Self::Output => "output",
            Self::OutputReference => "output_ref",
            Self::OutputControl => "output_control",
            Self::Input => "input",
            Self::Browse => "browse",
            Self::BrowseResource => "browse_resource",
            Self::Prompt => "prompt",
            Self::Link => "link",
            Self::Ftp => "ftp",
            Self::LocateCoord => "locate_coord",
            Self::LocateRef => "locate_ref",
            Self::GetStep => "get_step",
            Self::GetDir => "get_dir",
            Self::Sleep => "sleep",
            Self::Rgb => "rgb",
            Self::Gradient => "gradient",
            Self::DebuggerBreakpoint => "breakpoint",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
