//! Arena representation of the analyzed IR.
//!
//! Modules own their functions, functions own their basic blocks and
//! instructions, and everything downstream of the loader refers into the
//! arena through small index handles ([`FunctionRef`], [`InstrRef`], ...).
//! The arena is immutable once a [`ModuleSet`] has been assembled; forward
//! def-use edges (`users`) are derived from the operand lists at that point
//! and are never serialized.

use serde::{Deserialize, Serialize};

use crate::FastHashMap;

pub mod builder;
pub use builder::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// Lookup key for a function inside a [`ModuleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionRef {
    pub module:   ModuleId,
    pub function: FunctionId,
}

/// Lookup key for a single instruction inside a [`ModuleSet`].
///
/// Site records hold these instead of references so they stay `'static`
/// while the arena itself is borrowed by the analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrRef {
    pub module:   ModuleId,
    pub function: FunctionId,
    pub instr:    InstrId,
}

impl FunctionRef {
    pub fn instr(&self, instr: InstrId) -> InstrRef {
        InstrRef { module: self.module, function: self.function, instr }
    }
}

impl InstrRef {
    pub fn function_ref(&self) -> FunctionRef {
        FunctionRef { module: self.module, function: self.function }
    }
}

impl std::fmt::Display for InstrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.module.0, self.function.0, self.instr.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Int { bits: u32 },
    Pointer { pointee: TypeId },
    /// Named struct type. The name is the fully qualified channel-struct
    /// string when the struct is a channel endpoint, e.g.
    /// `std::sync::mpsc::Sender<u32>`.
    Struct { name: String },
    Void,
    Other,
}

/// An operand of an instruction.
///
/// Def-use users are tracked for instruction results and function arguments
/// only; constants are terminal for every traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueRef {
    Instr(InstrId),
    Arg(u32),
    ConstInt { bits: u32, value: i64 },
    Function(String),
    ConstOther,
    Undef,
}

impl ValueRef {
    pub fn const_int(&self) -> Option<i64> {
        match self {
            ValueRef::ConstInt { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Call target. Indirect calls carry no name and are opaque to the walker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Callee {
    Direct(String),
    Indirect,
}

impl Callee {
    pub fn name(&self) -> Option<&str> {
        match self {
            Callee::Direct(name) => Some(name),
            Callee::Indirect => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugLoc {
    pub file: FileId,
    pub line: u32,
}

/// Closed variant over the instruction kinds the analyses care about.
///
/// Everything else the producer emits lands in `Other` with its operands
/// preserved so def-use stays intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstrKind {
    Call {
        callee:     Callee,
        args:       Vec<ValueRef>,
        /// set when the callee returns a struct through a hidden
        /// out-pointer passed as argument 0
        struct_ret: bool,
    },
    Invoke {
        callee:     Callee,
        args:       Vec<ValueRef>,
        struct_ret: bool,
        normal:     BlockId,
        unwind:     BlockId,
    },
    Load { ptr: ValueRef },
    Store { value: ValueRef, ptr: ValueRef },
    Bitcast { source: ValueRef },
    Alloca,
    MemTransfer { dest: ValueRef, source: ValueRef },
    ElementPtr { base: ValueRef, indices: Vec<ValueRef> },
    Phi { incoming: Vec<(ValueRef, BlockId)> },
    Switch { selector: ValueRef, default: BlockId, cases: Vec<(i64, BlockId)> },
    ZExt { source: ValueRef },
    Ret { value: Option<ValueRef> },
    Br { dest: BlockId },
    CondBr { cond: ValueRef, then_dest: BlockId, else_dest: BlockId },
    Unreachable,
    Other { operands: Vec<ValueRef> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub kind:  InstrKind,
    /// result type; `Void` for instructions without a result
    pub ty:    TypeId,
    pub debug: Option<DebugLoc>,
    /// forward def-use edges, computed at finalize
    #[serde(skip)]
    pub users: Vec<InstrId>,
}

impl Instruction {
    pub fn new(kind: InstrKind, ty: TypeId) -> Self {
        Self { kind, ty, debug: None, users: Vec::new() }
    }

    pub fn with_debug(mut self, file: FileId, line: u32) -> Self {
        self.debug = Some(DebugLoc { file, line });
        self
    }

    pub fn line(&self) -> Option<u32> {
        self.debug.map(|d| d.line)
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, InstrKind::Call { .. } | InstrKind::Invoke { .. })
    }

    pub fn callee(&self) -> Option<&Callee> {
        match &self.kind {
            InstrKind::Call { callee, .. } | InstrKind::Invoke { callee, .. } => Some(callee),
            _ => None,
        }
    }

    pub fn call_args(&self) -> Option<&[ValueRef]> {
        match &self.kind {
            InstrKind::Call { args, .. } | InstrKind::Invoke { args, .. } => Some(args),
            _ => None,
        }
    }

    pub fn struct_ret(&self) -> bool {
        match self.kind {
            InstrKind::Call { struct_ret, .. } | InstrKind::Invoke { struct_ret, .. } => struct_ret,
            _ => false,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            InstrKind::Invoke { .. } |
                InstrKind::Switch { .. } |
                InstrKind::Ret { .. } |
                InstrKind::Br { .. } |
                InstrKind::CondBr { .. } |
                InstrKind::Unreachable
        )
    }

    /// Successor blocks of a terminator, in the producer's order: an invoke
    /// lists `[normal, unwind]`, a switch `[default, case...]`.
    pub fn successors(&self) -> Vec<BlockId> {
        match &self.kind {
            InstrKind::Invoke { normal, unwind, .. } => vec![*normal, *unwind],
            InstrKind::Switch { default, cases, .. } => {
                let mut succs = Vec::with_capacity(cases.len() + 1);
                succs.push(*default);
                succs.extend(cases.iter().map(|(_, dest)| *dest));
                succs
            }
            InstrKind::Br { dest } => vec![*dest],
            InstrKind::CondBr { then_dest, else_dest, .. } => vec![*then_dest, *else_dest],
            _ => Vec::new(),
        }
    }

    pub fn for_each_operand<F: FnMut(&ValueRef)>(&self, f: &mut F) {
        match &self.kind {
            InstrKind::Call { args, .. } | InstrKind::Invoke { args, .. } => {
                args.iter().for_each(|a| f(a))
            }
            InstrKind::Load { ptr } => f(ptr),
            InstrKind::Store { value, ptr } => {
                f(value);
                f(ptr)
            }
            InstrKind::Bitcast { source } | InstrKind::ZExt { source } => f(source),
            InstrKind::MemTransfer { dest, source } => {
                f(dest);
                f(source)
            }
            InstrKind::ElementPtr { base, indices } => {
                f(base);
                indices.iter().for_each(|i| f(i))
            }
            InstrKind::Phi { incoming } => incoming.iter().for_each(|(v, _)| f(v)),
            InstrKind::Switch { selector, .. } => f(selector),
            InstrKind::Ret { value } => {
                if let Some(v) = value {
                    f(v)
                }
            }
            InstrKind::CondBr { cond, .. } => f(cond),
            InstrKind::Other { operands } => operands.iter().for_each(|o| f(o)),
            InstrKind::Alloca | InstrKind::Br { .. } | InstrKind::Unreachable => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub instrs: Vec<InstrId>,
}

impl BasicBlock {
    pub fn terminator(&self) -> Option<InstrId> {
        self.instrs.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// mangled symbol name
    pub name:       String,
    /// debug display name, when the producer kept debug info
    pub subprogram: Option<String>,
    pub params:     Vec<TypeId>,
    pub blocks:     Vec<BasicBlock>,
    pub instrs:     Vec<Instruction>,
    #[serde(skip)]
    arg_users:      Vec<Vec<InstrId>>,
    #[serde(skip)]
    instr_blocks:   Vec<BlockId>,
}

impl Function {
    /// A function without a body is an external declaration.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn display_name(&self) -> &str {
        self.subprogram.as_deref().unwrap_or(&self.name)
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        (!self.blocks.is_empty()).then_some(BlockId(0))
    }

    pub fn instr(&self, id: InstrId) -> &Instruction {
        &self.instrs[id.0 as usize]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    pub fn block_of(&self, id: InstrId) -> BlockId {
        self.instr_blocks[id.0 as usize]
    }

    pub fn terminator_of(&self, id: BlockId) -> Option<&Instruction> {
        self.block(id).terminator().map(|t| self.instr(t))
    }

    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        self.terminator_of(id).map(|t| t.successors()).unwrap_or_default()
    }

    pub fn single_successor(&self, id: BlockId) -> Option<BlockId> {
        let succs = self.successors(id);
        match succs.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Forward def-use edges of a value in this function. Constants have no
    /// tracked users.
    pub fn users_of(&self, value: &ValueRef) -> &[InstrId] {
        match value {
            ValueRef::Instr(id) => &self.instrs[id.0 as usize].users,
            ValueRef::Arg(idx) => {
                self.arg_users.get(*idx as usize).map(Vec::as_slice).unwrap_or(&[])
            }
            _ => &[],
        }
    }

    pub(crate) fn finalize(&mut self) {
        self.instr_blocks = vec![BlockId(0); self.instrs.len()];
        for (bid, block) in self.blocks.iter().enumerate() {
            for iid in &block.instrs {
                self.instr_blocks[iid.0 as usize] = BlockId(bid as u32);
            }
        }

        self.arg_users = vec![Vec::new(); self.params.len()];
        let mut users: Vec<Vec<InstrId>> = vec![Vec::new(); self.instrs.len()];
        {
            let arg_users = &mut self.arg_users;
            for (idx, instr) in self.instrs.iter().enumerate() {
                let user = InstrId(idx as u32);
                instr.for_each_operand(&mut |value| match value {
                    ValueRef::Instr(id) => users[id.0 as usize].push(user),
                    ValueRef::Arg(arg) => {
                        if let Some(slot) = arg_users.get_mut(*arg as usize) {
                            slot.push(user)
                        }
                    }
                    _ => {}
                });
            }
        }
        for (instr, list) in self.instrs.iter_mut().zip(users) {
            instr.users = list;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name:      String,
    /// debug-info source files, referenced by [`DebugLoc::file`]
    pub files:     Vec<String>,
    pub types:     Vec<Type>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn ty(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize)
    }

    pub fn file(&self, id: FileId) -> Option<&str> {
        self.files.get(id.0 as usize).map(String::as_str)
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    /// Resolves a value to the struct name its pointer type points at, the
    /// shape a channel-handle argument has.
    pub fn pointee_struct_name(&self, func: &Function, value: &ValueRef) -> Option<&str> {
        let ty = match value {
            ValueRef::Instr(id) => func.instr(*id).ty,
            ValueRef::Arg(idx) => *func.params.get(*idx as usize)?,
            _ => return None,
        };
        match self.ty(ty)? {
            Type::Pointer { pointee } => match self.ty(*pointee)? {
                Type::Struct { name } => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn finalize(&mut self) {
        for func in &mut self.functions {
            func.finalize();
        }
    }
}

/// The full set of modules under analysis, plus a symbol index used by the
/// guided walker to resolve direct callees across modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleSet {
    modules: Vec<Module>,
    symbols: FastHashMap<String, FunctionRef>,
}

impl ModuleSet {
    /// Finalizes every module (def-use edges, block assignment) and indexes
    /// defined symbols. The first definition of a symbol wins; declarations
    /// never enter the index.
    pub fn new(mut modules: Vec<Module>) -> Self {
        let mut symbols = FastHashMap::default();
        for (midx, module) in modules.iter_mut().enumerate() {
            module.finalize();
            for (fidx, func) in module.functions.iter().enumerate() {
                if func.is_declaration() {
                    continue
                }
                symbols.entry(func.name.clone()).or_insert(FunctionRef {
                    module:   ModuleId(midx as u32),
                    function: FunctionId(fidx as u32),
                });
            }
        }
        Self { modules, symbols }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0 as usize]
    }

    pub fn function(&self, fref: FunctionRef) -> &Function {
        self.module(fref.module).function(fref.function)
    }

    pub fn instr(&self, iref: InstrRef) -> &Instruction {
        self.function(iref.function_ref()).instr(iref.instr)
    }

    /// Looks up the defining function for a mangled symbol.
    pub fn resolve(&self, symbol: &str) -> Option<FunctionRef> {
        self.symbols.get(symbol).copied()
    }

    pub fn iter_functions(&self) -> impl Iterator<Item = (FunctionRef, &Function)> {
        self.modules.iter().enumerate().flat_map(|(midx, module)| {
            module.functions.iter().enumerate().map(move |(fidx, func)| {
                (
                    FunctionRef {
                        module:   ModuleId(midx as u32),
                        function: FunctionId(fidx as u32),
                    },
                    func,
                )
            })
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn int_store_function() -> Function {
        // %0 = alloca
        // store 7, %0
        // %2 = load %0
        // ret %2
        let mut func = Function {
            name:       "f".to_string(),
            subprogram: None,
            params:     vec![],
            blocks:     vec![BasicBlock {
                instrs: vec![InstrId(0), InstrId(1), InstrId(2), InstrId(3)],
            }],
            instrs:     vec![
                Instruction::new(InstrKind::Alloca, TypeId(0)),
                Instruction::new(
                    InstrKind::Store {
                        value: ValueRef::ConstInt { bits: 32, value: 7 },
                        ptr:   ValueRef::Instr(InstrId(0)),
                    },
                    TypeId(1),
                ),
                Instruction::new(InstrKind::Load { ptr: ValueRef::Instr(InstrId(0)) }, TypeId(0)),
                Instruction::new(
                    InstrKind::Ret { value: Some(ValueRef::Instr(InstrId(2))) },
                    TypeId(1),
                ),
            ],
            arg_users:  vec![],
            instr_blocks: vec![],
        };
        func.finalize();
        func
    }

    #[test]
    fn users_follow_operands() {
        let func = int_store_function();
        // the alloca feeds the store and the load
        assert_eq!(func.users_of(&ValueRef::Instr(InstrId(0))), &[InstrId(1), InstrId(2)]);
        // the load feeds the ret
        assert_eq!(func.users_of(&ValueRef::Instr(InstrId(2))), &[InstrId(3)]);
        // constants have no tracked users
        assert_eq!(func.users_of(&ValueRef::ConstInt { bits: 32, value: 7 }), &[] as &[InstrId]);
    }

    #[test]
    fn block_assignment_is_computed() {
        let func = int_store_function();
        assert_eq!(func.block_of(InstrId(2)), BlockId(0));
        assert!(func.instr(InstrId(3)).is_terminator());
        assert!(func.successors(BlockId(0)).is_empty());
    }

    #[test]
    fn users_survive_a_serde_round_trip() {
        let mut module = Module {
            name:      "m".to_string(),
            files:     vec![],
            types:     vec![Type::Int { bits: 32 }, Type::Void],
            functions: vec![int_store_function()],
        };
        module.finalize();

        let json = serde_json::to_string(&module).unwrap();
        let set = ModuleSet::new(vec![serde_json::from_str(&json).unwrap()]);
        let func = set.function(FunctionRef { module: ModuleId(0), function: FunctionId(0) });
        assert_eq!(func.users_of(&ValueRef::Instr(InstrId(0))), &[InstrId(1), InstrId(2)]);
    }

    #[test]
    fn declarations_do_not_enter_the_symbol_index() {
        let decl = Function {
            name:       "ext".to_string(),
            subprogram: None,
            params:     vec![],
            blocks:     vec![],
            instrs:     vec![],
            arg_users:  vec![],
            instr_blocks: vec![],
        };
        let module = Module {
            name:      "m".to_string(),
            files:     vec![],
            types:     vec![],
            functions: vec![decl],
        };
        let set = ModuleSet::new(vec![module]);
        assert!(set.resolve("ext").is_none());
    }
}
