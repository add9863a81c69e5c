//! Programmatic construction of GLSL syntax trees.
//!
//! Every node gets a fresh `NodeId` and the builder's current span, which
//! callers move with `at`.

use crate::ast::*;

pub struct AstBuilder {
    counter: NodeCounter,
    span: Span,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        AstBuilder {
            counter: NodeCounter::new(),
            span: Span::new(1, 1),
        }
    }

    /// Span given to nodes built from here on
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.span = Span::new(line, column);
        self
    }

    fn node<T>(&mut self, kind: T) -> Node<T> {
        self.counter.mk_node_at(kind, self.span)
    }

    // --- Types ---

    pub fn ty(&self, name: &str) -> FullySpecifiedType {
        self.qualified(QualifierFlags::empty(), name)
    }

    pub fn qualified(&self, flags: QualifierFlags, name: &str) -> FullySpecifiedType {
        FullySpecifiedType {
            qualifier: TypeQualifier::new(flags),
            specifier: TypeSpecifier {
                kind: TypeSpecifierKind::Named(name.to_string()),
                array_specifier: None,
            },
        }
    }

    /// Type whose specifier is an inline struct definition
    pub fn struct_type(&self, flags: QualifierFlags, spec: Node<StructSpecifier>) -> FullySpecifiedType {
        FullySpecifiedType {
            qualifier: TypeQualifier::new(flags),
            specifier: TypeSpecifier {
                kind: TypeSpecifierKind::Struct(Box::new(spec)),
                array_specifier: None,
            },
        }
    }

    /// `[n][m]...`; `None` is an unsized dimension
    pub fn array(&mut self, sizes: &[Option<i32>]) -> ArraySpecifier {
        let dimensions = sizes
            .iter()
            .map(|size| match size {
                Some(n) => ArraySize::Sized(Box::new(self.int(*n))),
                None => ArraySize::Unsized,
            })
            .collect();
        ArraySpecifier { dimensions }
    }

    // --- Expressions ---

    pub fn ident(&mut self, name: &str) -> Expression {
        self.node(ExprKind::Identifier(name.to_string()))
    }

    pub fn int(&mut self, n: i32) -> Expression {
        self.node(ExprKind::IntConstant(n))
    }

    pub fn uint(&mut self, n: u32) -> Expression {
        self.node(ExprKind::UintConstant(n))
    }

    pub fn float(&mut self, f: f32) -> Expression {
        self.node(ExprKind::FloatConstant(f))
    }

    pub fn boolean(&mut self, b: bool) -> Expression {
        self.node(ExprKind::BoolConstant(b))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expression) -> Expression {
        self.node(ExprKind::Unary(op, Box::new(operand)))
    }

    pub fn binary(&mut self, op: BinaryOp, left: Expression, right: Expression) -> Expression {
        self.node(ExprKind::Binary(op, Box::new(left), Box::new(right)))
    }

    pub fn assign(&mut self, lhs: Expression, rhs: Expression) -> Expression {
        self.assign_op(AssignOp::Assign, lhs, rhs)
    }

    pub fn assign_op(&mut self, op: AssignOp, lhs: Expression, rhs: Expression) -> Expression {
        self.node(ExprKind::Assign(op, Box::new(lhs), Box::new(rhs)))
    }

    pub fn conditional(&mut self, cond: Expression, then_expr: Expression, else_expr: Expression) -> Expression {
        self.node(ExprKind::Conditional(Box::new(cond), Box::new(then_expr), Box::new(else_expr)))
    }

    pub fn index(&mut self, base: Expression, index: Expression) -> Expression {
        self.node(ExprKind::ArrayIndex(Box::new(base), Box::new(index)))
    }

    pub fn field(&mut self, base: Expression, field: &str) -> Expression {
        self.node(ExprKind::FieldSelection(FieldSelection {
            base: Box::new(base),
            field: field.to_string(),
            method_args: None,
        }))
    }

    /// `base.name(args)`
    pub fn method(&mut self, base: Expression, name: &str, args: Vec<Expression>) -> Expression {
        self.node(ExprKind::FieldSelection(FieldSelection {
            base: Box::new(base),
            field: name.to_string(),
            method_args: Some(args),
        }))
    }

    pub fn call(&mut self, name: &str, args: Vec<Expression>) -> Expression {
        self.node(ExprKind::Call(FunctionCall {
            callee: Callee::Function(name.to_string()),
            args,
        }))
    }

    pub fn construct(&mut self, type_name: &str, args: Vec<Expression>) -> Expression {
        let specifier = TypeSpecifier {
            kind: TypeSpecifierKind::Named(type_name.to_string()),
            array_specifier: None,
        };
        self.node(ExprKind::Call(FunctionCall {
            callee: Callee::Constructor(specifier),
            args,
        }))
    }

    pub fn sequence(&mut self, elements: Vec<Expression>) -> Expression {
        self.node(ExprKind::Sequence(elements))
    }

    pub fn aggregate(&mut self, elements: Vec<Expression>) -> Expression {
        self.node(ExprKind::Aggregate(elements))
    }

    // --- Declarations ---

    pub fn declaration(
        &mut self,
        name: &str,
        array_specifier: Option<ArraySpecifier>,
        initializer: Option<Expression>,
    ) -> Node<Declaration> {
        self.node(Declaration {
            identifier: name.to_string(),
            array_specifier,
            initializer,
        })
    }

    pub fn declarator_list(&mut self, ty: FullySpecifiedType, declarations: Vec<Node<Declaration>>) -> Statement {
        self.node(StmtKind::Declaration(DeclaratorList {
            ty,
            invariant: false,
            declarations,
        }))
    }

    /// `T a, b, c;`
    pub fn declare(&mut self, ty: FullySpecifiedType, names: &[&str]) -> Statement {
        let declarations = names.iter().map(|n| self.declaration(n, None, None)).collect();
        self.declarator_list(ty, declarations)
    }

    /// `T name = init;`
    pub fn declare_init(&mut self, ty: FullySpecifiedType, name: &str, init: Expression) -> Statement {
        let declaration = self.declaration(name, None, Some(init));
        self.declarator_list(ty, vec![declaration])
    }

    /// Member list of a struct or block: `T a, b;`
    pub fn member(&mut self, ty: FullySpecifiedType, names: &[&str]) -> DeclaratorList {
        DeclaratorList {
            ty,
            invariant: false,
            declarations: names.iter().map(|n| self.declaration(n, None, None)).collect(),
        }
    }

    pub fn struct_specifier(&mut self, name: &str, declarations: Vec<DeclaratorList>) -> Node<StructSpecifier> {
        self.node(StructSpecifier {
            name: name.to_string(),
            declarations,
        })
    }

    /// `struct name { ... };` on its own
    pub fn struct_definition(&mut self, name: &str, declarations: Vec<DeclaratorList>) -> Statement {
        let spec = self.struct_specifier(name, declarations);
        let ty = self.struct_type(QualifierFlags::empty(), spec);
        self.declarator_list(ty, Vec::new())
    }

    pub fn interface_block(
        &mut self,
        flags: QualifierFlags,
        block_name: &str,
        instance_name: Option<&str>,
        declarations: Vec<DeclaratorList>,
    ) -> Statement {
        self.node(StmtKind::InterfaceBlock(InterfaceBlock {
            qualifier: TypeQualifier::new(flags),
            block_name: block_name.to_string(),
            instance_name: instance_name.map(str::to_string),
            array_specifier: None,
            declarations,
        }))
    }

    pub fn parameter(&mut self, ty: FullySpecifiedType, name: Option<&str>) -> Node<ParameterDeclarator> {
        self.node(ParameterDeclarator {
            ty,
            identifier: name.map(str::to_string),
            array_specifier: None,
            formal_parameter: name.is_none(),
        })
    }

    pub fn prototype(
        &mut self,
        return_type: FullySpecifiedType,
        name: &str,
        parameters: Vec<Node<ParameterDeclarator>>,
    ) -> Node<FunctionPrototype> {
        self.node(FunctionPrototype {
            return_type,
            name: name.to_string(),
            parameters,
        })
    }

    /// Definition whose body shares the parameters' scope
    pub fn function(&mut self, prototype: Node<FunctionPrototype>, body: Vec<Statement>) -> Node<FunctionDefinition> {
        let body = self.node(StmtKind::Compound(CompoundStatement {
            new_scope: false,
            statements: body,
        }));
        self.node(FunctionDefinition {
            prototype,
            body: Box::new(body),
        })
    }

    /// `void main() { ... }`
    pub fn main(&mut self, body: Vec<Statement>) -> Node<FunctionDefinition> {
        let void = self.ty("void");
        let proto = self.prototype(void, "main", Vec::new());
        self.function(proto, body)
    }

    pub fn gs_input_layout(&mut self, primitive: spirv::ExecutionMode) -> Node<GsInputLayout> {
        self.node(GsInputLayout { primitive })
    }

    // --- Statements ---

    pub fn expr_stmt(&mut self, e: Expression) -> Statement {
        self.node(StmtKind::Expression(Some(e)))
    }

    pub fn compound(&mut self, statements: Vec<Statement>) -> Statement {
        self.node(StmtKind::Compound(CompoundStatement {
            new_scope: true,
            statements,
        }))
    }

    pub fn if_else(&mut self, condition: Expression, then_statement: Statement, else_statement: Option<Statement>) -> Statement {
        self.node(StmtKind::Selection(SelectionStatement {
            condition: Box::new(condition),
            then_statement: Box::new(then_statement),
            else_statement: else_statement.map(Box::new),
        }))
    }

    pub fn for_loop(
        &mut self,
        init: Option<Statement>,
        condition: Option<Expression>,
        rest: Option<Expression>,
        body: Statement,
    ) -> Statement {
        self.iteration(IterationMode::For, init, condition, rest, body)
    }

    pub fn while_loop(&mut self, condition: Expression, body: Statement) -> Statement {
        self.iteration(IterationMode::While, None, Some(condition), None, body)
    }

    pub fn do_while(&mut self, body: Statement, condition: Expression) -> Statement {
        self.iteration(IterationMode::DoWhile, None, Some(condition), None, body)
    }

    fn iteration(
        &mut self,
        mode: IterationMode,
        init: Option<Statement>,
        condition: Option<Expression>,
        rest: Option<Expression>,
        body: Statement,
    ) -> Statement {
        self.node(StmtKind::Iteration(IterationStatement {
            mode,
            init: init.map(Box::new),
            condition: condition.map(Box::new),
            rest: rest.map(Box::new),
            body: Box::new(body),
        }))
    }

    pub fn case(&mut self, labels: Vec<CaseLabel>, statements: Vec<Statement>) -> Node<CaseStatement> {
        self.node(CaseStatement { labels, statements })
    }

    pub fn switch(&mut self, test: Expression, cases: Vec<Node<CaseStatement>>) -> Statement {
        let body = self.node(SwitchBody { cases });
        self.node(StmtKind::Switch(SwitchStatement {
            test: Box::new(test),
            body,
        }))
    }

    pub fn jump(&mut self, kind: JumpKind) -> Statement {
        self.node(StmtKind::Jump(kind))
    }

    pub fn discard(&mut self) -> Statement {
        self.jump(JumpKind::Discard)
    }

    pub fn ret(&mut self, value: Option<Expression>) -> Statement {
        self.jump(JumpKind::Return(value.map(Box::new)))
    }
}

/// Translation unit from top-level items
pub fn unit(external_declarations: Vec<ExternalDeclaration>) -> TranslationUnit {
    TranslationUnit { external_declarations }
}
