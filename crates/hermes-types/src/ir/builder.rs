//! Programmatic construction of IR modules.
//!
//! The loader deserializes dumps straight into the arena; this builder is the
//! construction path for front-ends and for test fixtures. Types are
//! deduplicated structurally so repeated `int_type(32)` calls hand back the
//! same [`TypeId`].

use super::{
    BasicBlock, BlockId, FileId, Function, FunctionId, InstrId, InstrKind, Instruction, Module,
    Type, TypeId,
};

#[derive(Debug, Default)]
pub struct ModuleBuilder {
    name:      String,
    files:     Vec<String>,
    types:     Vec<Type>,
    functions: Vec<Function>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    fn intern_type(&mut self, ty: Type) -> TypeId {
        if let Some(pos) = self.types.iter().position(|t| *t == ty) {
            return TypeId(pos as u32)
        }
        self.types.push(ty);
        TypeId((self.types.len() - 1) as u32)
    }

    pub fn int_type(&mut self, bits: u32) -> TypeId {
        self.intern_type(Type::Int { bits })
    }

    pub fn void_type(&mut self) -> TypeId {
        self.intern_type(Type::Void)
    }

    pub fn struct_type(&mut self, name: impl Into<String>) -> TypeId {
        self.intern_type(Type::Struct { name: name.into() })
    }

    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId {
        self.intern_type(Type::Pointer { pointee })
    }

    pub fn file(&mut self, path: impl Into<String>) -> FileId {
        let path = path.into();
        if let Some(pos) = self.files.iter().position(|f| *f == path) {
            return FileId(pos as u32)
        }
        self.files.push(path);
        FileId((self.files.len() - 1) as u32)
    }

    pub fn function(&mut self, func: FunctionBuilder) -> FunctionId {
        self.functions.push(func.build());
        FunctionId((self.functions.len() - 1) as u32)
    }

    /// Declares a bodyless external function.
    pub fn declaration(&mut self, name: impl Into<String>) -> FunctionId {
        self.function(FunctionBuilder::new(name))
    }

    pub fn build(self) -> Module {
        let mut module = Module {
            name:      self.name,
            files:     self.files,
            types:     self.types,
            functions: self.functions,
        };
        module.finalize();
        module
    }
}

#[derive(Debug, Default)]
pub struct FunctionBuilder {
    name:       String,
    subprogram: Option<String>,
    params:     Vec<TypeId>,
    blocks:     Vec<BasicBlock>,
    instrs:     Vec<Instruction>,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn subprogram(mut self, name: impl Into<String>) -> Self {
        self.subprogram = Some(name.into());
        self
    }

    pub fn param(&mut self, ty: TypeId) -> u32 {
        self.params.push(ty);
        (self.params.len() - 1) as u32
    }

    pub fn block(&mut self) -> BlockId {
        self.blocks.push(BasicBlock::default());
        BlockId((self.blocks.len() - 1) as u32)
    }

    /// Appends an instruction to a block and hands back its id.
    pub fn push(&mut self, block: BlockId, instr: Instruction) -> InstrId {
        let id = InstrId(self.instrs.len() as u32);
        self.instrs.push(instr);
        self.blocks[block.0 as usize].instrs.push(id);
        id
    }

    pub fn push_kind(&mut self, block: BlockId, kind: InstrKind, ty: TypeId) -> InstrId {
        self.push(block, Instruction::new(kind, ty))
    }

    fn build(self) -> Function {
        Function {
            name:         self.name,
            subprogram:   self.subprogram,
            params:       self.params,
            blocks:       self.blocks,
            instrs:       self.instrs,
            arg_users:    Vec::new(),
            instr_blocks: Vec::new(),
        }
    }
}
