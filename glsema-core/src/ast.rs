//! GLSL abstract syntax tree consumed by the semantic pass.
//!
//! The tree comes from an external parser and is never mutated here. Results
//! computed per node (side effects, selection kind, reflection links) are kept
//! in `analyzer::Annotations`, keyed by `NodeId`.

pub use spirv;

use bitflags::bitflags;

/// Unique identifier for AST nodes.
/// Used to look up per-node annotations after analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        NodeId(value)
    }
}

/// Source location of a node (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Counter for generating unique node IDs while a tree is built
#[derive(Debug, Clone)]
pub struct NodeCounter {
    next_id: u32,
}

impl NodeCounter {
    pub fn new() -> Self {
        NodeCounter { next_id: 0 }
    }

    pub fn next(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        NodeId(id)
    }

    pub fn mk_node<T>(&mut self, kind: T) -> Node<T> {
        self.mk_node_at(kind, Span::default())
    }

    pub fn mk_node_at<T>(&mut self, kind: T, span: Span) -> Node<T> {
        Node {
            h: Header { id: self.next(), span },
            kind,
        }
    }
}

impl Default for NodeCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct Header {
    pub id: NodeId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Node<T> {
    pub h: Header,
    pub kind: T,
}

impl<T> Node<T> {
    pub fn id(&self) -> NodeId {
        self.h.id
    }

    pub fn span(&self) -> Span {
        self.h.span
    }
}

impl<T> PartialEq for Node<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

pub type Expression = Node<ExprKind>;
pub type Statement = Node<StmtKind>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslationUnit {
    pub external_declarations: Vec<ExternalDeclaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExternalDeclaration {
    /// A declaration statement (`StmtKind::Declaration` or `StmtKind::InterfaceBlock`)
    Declaration(Statement),
    Prototype(Node<FunctionPrototype>),
    Function(Node<FunctionDefinition>),
    GsInputLayout(Node<GsInputLayout>),
}

// --- Qualifiers and types ---

bitflags! {
    /// Qualifier keywords attached to a declaration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct QualifierFlags: u32 {
        const INVARIANT = 1 << 0;
        const CONSTANT = 1 << 1;
        const ATTRIBUTE = 1 << 2;
        const VARYING = 1 << 3;
        const IN = 1 << 4;
        const OUT = 1 << 5;
        const CENTROID = 1 << 6;
        const SAMPLE = 1 << 7;
        const UNIFORM = 1 << 8;
        const SMOOTH = 1 << 9;
        const FLAT = 1 << 10;
        const NOPERSPECTIVE = 1 << 11;
        const ROW_MAJOR = 1 << 12;
        const COLUMN_MAJOR = 1 << 13;
        const INOUT = Self::IN.bits() | Self::OUT.bits();
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeQualifier {
    pub flags: QualifierFlags,
    /// `layout(location = N)`
    pub location: Option<i32>,
}

impl TypeQualifier {
    pub fn new(flags: QualifierFlags) -> Self {
        TypeQualifier { flags, location: None }
    }

    pub fn has(&self, flags: QualifierFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn has_interpolation(&self) -> bool {
        self.flags
            .intersects(QualifierFlags::SMOOTH | QualifierFlags::FLAT | QualifierFlags::NOPERSPECTIVE)
    }

    pub fn has_matrix_layout(&self) -> bool {
        self.flags.intersects(QualifierFlags::ROW_MAJOR | QualifierFlags::COLUMN_MAJOR)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArraySize {
    /// `[]`
    Unsized,
    /// `[expr]`; must fold to a positive integer constant
    Sized(Box<Expression>),
}

/// Array dimensions in source order: `a[2][3]` is `[2, 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySpecifier {
    pub dimensions: Vec<ArraySize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpecifierKind {
    /// Builtin (`vec3`) or user (`Light`) type name
    Named(String),
    Struct(Box<Node<StructSpecifier>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpecifier {
    pub kind: TypeSpecifierKind,
    /// `float[3] a;`
    pub array_specifier: Option<ArraySpecifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullySpecifiedType {
    pub qualifier: TypeQualifier,
    pub specifier: TypeSpecifier,
}

// --- Declarations ---

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub identifier: String,
    pub array_specifier: Option<ArraySpecifier>,
    pub initializer: Option<Expression>,
}

/// `T a, b[2] = ...;` - one shared type, many declared names
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaratorList {
    pub ty: FullySpecifiedType,
    pub invariant: bool,
    pub declarations: Vec<Node<Declaration>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructSpecifier {
    pub name: String,
    pub declarations: Vec<DeclaratorList>,
}

/// `uniform Block { ... } instance[N];`
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceBlock {
    pub qualifier: TypeQualifier,
    pub block_name: String,
    pub instance_name: Option<String>,
    pub array_specifier: Option<ArraySpecifier>,
    pub declarations: Vec<DeclaratorList>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDeclarator {
    pub ty: FullySpecifiedType,
    pub identifier: Option<String>,
    pub array_specifier: Option<ArraySpecifier>,
    /// Set for bare formal parameters such as `void f(float);`
    pub formal_parameter: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionPrototype {
    pub return_type: FullySpecifiedType,
    pub name: String,
    pub parameters: Vec<Node<ParameterDeclarator>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub prototype: Node<FunctionPrototype>,
    pub body: Box<Statement>,
}

/// Geometry shader `layout(triangles) in;`
///
/// `primitive` is one of the SPIR-V input primitive execution modes:
/// `InputPoints`, `InputLines`, `InputLinesAdjacency`, `Triangles`,
/// `InputTrianglesAdjacency`.
#[derive(Debug, Clone, PartialEq)]
pub struct GsInputLayout {
    pub primitive: spirv::ExecutionMode,
}

// --- Statements ---

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Compound(CompoundStatement),
    Declaration(DeclaratorList),
    InterfaceBlock(InterfaceBlock),
    Expression(Option<Expression>),
    Selection(SelectionStatement),
    Switch(SwitchStatement),
    Iteration(IterationStatement),
    Jump(JumpKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundStatement {
    pub new_scope: bool,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionStatement {
    pub condition: Box<Expression>,
    pub then_statement: Box<Statement>,
    pub else_statement: Option<Box<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    pub test: Box<Expression>,
    pub body: Node<SwitchBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchBody {
    pub cases: Vec<Node<CaseStatement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    Case(Expression),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseStatement {
    pub labels: Vec<CaseLabel>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationMode {
    For,
    While,
    DoWhile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterationStatement {
    pub mode: IterationMode,
    pub init: Option<Box<Statement>>,
    pub condition: Option<Box<Expression>>,
    pub rest: Option<Box<Expression>>,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JumpKind {
    Continue,
    Break,
    Return(Option<Box<Expression>>),
    Discard,
}

// --- Expressions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    LogicalNot,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    /// Increment and decrement write their operand.
    pub fn is_mutating(self) -> bool {
        matches!(self, UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lshift,
    Rshift,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalXor,
    LogicalOr,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less
                | BinaryOp::Greater
                | BinaryOp::LessEqual
                | BinaryOp::GreaterEqual
                | BinaryOp::Equal
                | BinaryOp::NotEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalXor | BinaryOp::LogicalOr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    MulAssign,
    DivAssign,
    ModAssign,
    AddAssign,
    SubAssign,
    LsAssign,
    RsAssign,
    AndAssign,
    XorAssign,
    OrAssign,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Function(String),
    /// `vec3(...)`, `Light(...)`, `float[2](...)`
    Constructor(TypeSpecifier),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub callee: Callee,
    pub args: Vec<Expression>,
}

impl FunctionCall {
    pub fn is_constructor(&self) -> bool {
        matches!(self.callee, Callee::Constructor(_))
    }
}

/// `base.field`, or `base.field(args)` for method-style selection such as
/// `arr.length()`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    pub base: Box<Expression>,
    pub field: String,
    pub method_args: Option<Vec<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    IntConstant(i32),
    UintConstant(u32),
    FloatConstant(f32),
    BoolConstant(bool),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Assign(AssignOp, Box<Expression>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    ArrayIndex(Box<Expression>, Box<Expression>),
    FieldSelection(FieldSelection),
    Call(FunctionCall),
    /// Comma operator
    Sequence(Vec<Expression>),
    /// `{ a, b, c }` initializer
    Aggregate(Vec<Expression>),
}

impl ExprKind {
    /// Integer value of a literal constant, if this is one.
    pub fn int_constant(&self) -> Option<i64> {
        match self {
            ExprKind::IntConstant(n) => Some(i64::from(*n)),
            ExprKind::UintConstant(n) => Some(i64::from(*n)),
            _ => None,
        }
    }
}
