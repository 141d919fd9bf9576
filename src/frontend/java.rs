//! Java front end over `tree-sitter-java`.

use super::tree::{
    child_of_kind, field_children, guard_text, has_token, lock_initializer, named_children,
    parse_tree, text, type_text, Body,
};
use super::{Language, LanguageFrontend, LockOperation};
use crate::errors::Result;
use crate::model::{
    ClassKind, CompilationUnit, Expr, LiteralKind, OperationKind, RawClass, RawImport, RawMethod,
    RawVariable, TypeName,
};
use std::path::Path;
use tree_sitter::{Language as TsLanguage, Node};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct JavaFrontend;

fn grammar() -> TsLanguage {
    tree_sitter_java::LANGUAGE.into()
}

impl LanguageFrontend for JavaFrontend {
    fn language(&self) -> Language {
        Language::Java
    }

    fn parse_unit(&self, path: &Path, source: &str) -> Result<CompilationUnit> {
        let tree = parse_tree(&grammar(), path, source)?;
        let root = tree.root_node();
        let mut unit = CompilationUnit::new(path, "");
        let walker = Walker { source };

        for node in named_children(root) {
            match node.kind() {
                "package_declaration" => {
                    if let Some(name) = child_of_kind(node, &["scoped_identifier", "identifier"]) {
                        unit.package = text(name, source).to_string();
                    }
                }
                "import_declaration" => {
                    if let Some(name) = child_of_kind(node, &["scoped_identifier", "identifier"]) {
                        unit.imports.push(RawImport {
                            path: text(name, source).to_string(),
                            is_static: has_token(node, "static"),
                            wildcard: has_token(node, "asterisk"),
                        });
                    }
                }
                _ => {
                    if let Some(class) = walker.class(node) {
                        unit.classes.push(class);
                    }
                }
            }
        }
        debug!(path = %path.display(), classes = unit.classes.len(), "parsed java unit");
        Ok(unit)
    }

    fn generate_expression(&self, text: &str) -> Option<Expr> {
        let source = format!("class __Probe {{ Object __probe = ({text}); }}");
        let tree = parse_tree(&grammar(), Path::new("<expression>"), &source).ok()?;
        let root = tree.root_node();
        let class = child_of_kind(root, &["class_declaration"])?;
        let field = child_of_kind(class.child_by_field_name("body")?, &["field_declaration"])?;
        let value = field
            .child_by_field_name("declarator")?
            .child_by_field_name("value")?;
        let walker = Walker { source: &source };
        match walker.expr(value, &mut Body::new()) {
            Expr::Paren(inner) => Some(*inner),
            other => Some(other),
        }
    }

    fn lock_operation(&self, method: &str) -> Option<LockOperation> {
        match method {
            "lock" | "tryLock" | "lockInterruptibly" => Some(LockOperation::Acquire),
            "unlock" => Some(LockOperation::Release),
            _ => None,
        }
    }
}

fn modifier_tokens(node: Node<'_>) -> Vec<String> {
    let Some(modifiers) = child_of_kind(node, &["modifiers"]) else {
        return Vec::new();
    };
    let mut cursor = modifiers.walk();
    let tokens = modifiers
        .children(&mut cursor)
        .filter(|child| !child.is_named())
        .map(|child| child.kind().to_string())
        .collect();
    tokens
}

fn binary_kind(operator: &str) -> OperationKind {
    match operator {
        "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => OperationKind::Comparison,
        _ => OperationKind::Arithmetic,
    }
}

struct Walker<'s> {
    source: &'s str,
}

impl<'s> Walker<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        text(node, self.source)
    }

    fn class(&self, node: Node<'_>) -> Option<RawClass> {
        let kind = match node.kind() {
            "class_declaration" | "record_declaration" => ClassKind::Class,
            "interface_declaration" | "annotation_type_declaration" => ClassKind::Interface,
            "enum_declaration" => ClassKind::Enum,
            _ => return None,
        };
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let modifiers = modifier_tokens(node);

        let mut class = RawClass::new(name);
        class.kind = kind;
        class.is_abstract = modifiers.iter().any(|m| m == "abstract");
        class.type_params = self.type_params(node);

        if let Some(superclass) = node.child_by_field_name("superclass") {
            for ty in named_children(superclass) {
                class.supertypes.push(self.text(ty).to_string());
            }
        }
        let interfaces = node
            .child_by_field_name("interfaces")
            .or_else(|| child_of_kind(node, &["extends_interfaces", "super_interfaces"]));
        if let Some(interfaces) = interfaces {
            for list in named_children(interfaces) {
                for ty in named_children(list) {
                    class.supertypes.push(self.text(ty).to_string());
                }
            }
        }

        if let Some(parameters) = node.child_by_field_name("parameters") {
            for param in self.params(parameters) {
                class.fields.push(param);
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.members(body, &mut class);
        }
        Some(class)
    }

    fn type_params(&self, node: Node<'_>) -> Vec<String> {
        node.child_by_field_name("type_parameters")
            .map(|params| {
                named_children(params)
                    .into_iter()
                    .filter(|param| param.kind() == "type_parameter")
                    .filter_map(|param| named_children(param).into_iter().next())
                    .map(|name| self.text(name).to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn members(&self, body: Node<'_>, class: &mut RawClass) {
        for member in named_children(body) {
            match member.kind() {
                "enum_constant" => {
                    if let Some(name) = member.child_by_field_name("name") {
                        class.enum_constants.push(self.text(name).to_string());
                    }
                }
                "enum_body_declarations" => self.members(member, class),
                "field_declaration" | "constant_declaration" => {
                    let ty = member.child_by_field_name("type");
                    for declarator in field_children(member, "declarator") {
                        let Some(name) = declarator.child_by_field_name("name") else {
                            continue;
                        };
                        let mut field = RawVariable::new(
                            type_text(ty, declarator.child_by_field_name("dimensions"), self.source),
                            self.text(name),
                        );
                        if let Some(value) = declarator.child_by_field_name("value") {
                            field.initializer = lock_initializer(&self.expr(value, &mut Body::new()));
                        }
                        class.fields.push(field);
                    }
                }
                "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                    let interface = class.kind == ClassKind::Interface;
                    class.methods.push(self.method(member, &class.name, interface));
                }
                "static_initializer" | "block" => {
                    let name = if member.kind() == "static_initializer" {
                        "<clinit>"
                    } else {
                        "<init>"
                    };
                    let mut body = Body::new();
                    self.statement(member, &mut body);
                    class.methods.push(body.into_method(RawMethod::new(name)));
                }
                _ => {
                    if let Some(nested) = self.class(member) {
                        class.nested.push(nested);
                    }
                }
            }
        }
    }

    fn params(&self, parameters: Node<'_>) -> Vec<RawVariable> {
        named_children(parameters)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "formal_parameter" => {
                    let name = param.child_by_field_name("name")?;
                    Some(RawVariable::new(
                        type_text(
                            param.child_by_field_name("type"),
                            param.child_by_field_name("dimensions"),
                            self.source,
                        ),
                        self.text(name),
                    ))
                }
                "spread_parameter" => {
                    let ty = named_children(param)
                        .into_iter()
                        .find(|child| child.kind() != "modifiers" && child.kind() != "variable_declarator")?;
                    let declarator = child_of_kind(param, &["variable_declarator"])?;
                    let name = declarator.child_by_field_name("name")?;
                    Some(RawVariable::new(
                        format!("{}[]", self.text(ty)),
                        self.text(name),
                    ))
                }
                _ => None,
            })
            .collect()
    }

    fn method(&self, node: Node<'_>, class_name: &str, in_interface: bool) -> RawMethod {
        let modifiers = modifier_tokens(node);
        let has = |token: &str| modifiers.iter().any(|m| m == token);
        let body_node = node.child_by_field_name("body");

        let mut method = match node.kind() {
            "method_declaration" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|name| self.text(name))
                    .unwrap_or("<anonymous>");
                RawMethod::new(name).returns(type_text(
                    node.child_by_field_name("type"),
                    node.child_by_field_name("dimensions"),
                    self.source,
                ))
            }
            _ => RawMethod::constructor(class_name),
        };
        method.type_params = self.type_params(node);
        method.is_static = has("static");
        method.is_abstract = has("abstract") || (body_node.is_none() && (in_interface || !has("native")));
        if let Some(parameters) = node.child_by_field_name("parameters") {
            method.params = self.params(parameters);
        }

        let Some(body_node) = body_node else {
            return method;
        };
        let mut body = Body::new();
        let monitor = has("synchronized").then(|| {
            let guard = if method.is_static {
                format!("{class_name}.class")
            } else {
                "this".to_string()
            };
            body.sync_pair(&guard)
        });
        if let Some((acquire, _)) = &monitor {
            body.calls.push(acquire.clone());
        }
        self.statement(body_node, &mut body);
        if let Some((_, release)) = monitor {
            body.calls.push(release);
        }
        body.into_method(method)
    }

    /// Record `node` as a call site, then walk lambda bodies it deferred.
    fn record<'t>(&self, node: Node<'t>, body: &mut Body<'t>) {
        let expr = self.expr(node, body);
        body.record(expr);
        self.drain(body);
    }

    fn local_declaration<'t>(&self, node: Node<'t>, body: &mut Body<'t>) {
        let ty = node.child_by_field_name("type");
        for declarator in field_children(node, "declarator") {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let mut local = RawVariable::new(
                type_text(ty, declarator.child_by_field_name("dimensions"), self.source),
                self.text(name),
            );
            if let Some(value) = declarator.child_by_field_name("value") {
                let expr = self.expr(value, body);
                local.initializer = lock_initializer(&expr);
                body.locals.push(local);
                body.record(expr);
                self.drain(body);
            } else {
                body.locals.push(local);
            }
        }
    }

    fn drain<'t>(&self, body: &mut Body<'t>) {
        while let Some(deferred) = body.deferred.pop_front() {
            if matches!(deferred.kind(), "block" | "switch_block") {
                self.statement(deferred, body);
            } else {
                self.record(deferred, body);
            }
        }
    }

    fn statement<'t>(&self, node: Node<'t>, body: &mut Body<'t>) {
        match node.kind() {
            "block" | "constructor_body" | "switch_block" | "switch_block_statement_group"
            | "static_initializer" | "finally_clause" | "program" => {
                for child in named_children(node) {
                    self.statement(child, body);
                }
            }
            "switch_rule" => {
                for child in named_children(node) {
                    if child.kind() != "switch_label" {
                        self.statement(child, body);
                    }
                }
            }
            "switch_label" | "line_comment" | "block_comment" | "empty_statement" => {}
            "local_variable_declaration" => self.local_declaration(node, body),
            "expression_statement" | "parenthesized_expression" => {
                for child in named_children(node) {
                    self.record(child, body);
                }
            }
            "synchronized_statement" => {
                let guard = named_children(node)
                    .into_iter()
                    .find(|child| child.kind() == "parenthesized_expression");
                let guard_text = guard
                    .and_then(|guard| named_children(guard).into_iter().next())
                    .map(|inner| guard_text(inner, self.source))
                    .unwrap_or_else(|| "this".to_string());
                if let Some(guard) = guard {
                    self.record(guard, body);
                }
                let (acquire, release) = body.sync_pair(&guard_text);
                body.calls.push(acquire);
                if let Some(block) = node.child_by_field_name("body") {
                    self.statement(block, body);
                }
                body.calls.push(release);
            }
            "if_statement" | "while_statement" | "do_statement" => {
                for field in ["condition", "consequence", "alternative", "body"] {
                    if let Some(child) = node.child_by_field_name(field) {
                        self.statement_or_expr(child, body);
                    }
                }
            }
            "for_statement" => {
                for init in field_children(node, "init") {
                    self.statement_or_expr(init, body);
                }
                if let Some(condition) = node.child_by_field_name("condition") {
                    self.record(condition, body);
                }
                for update in field_children(node, "update") {
                    self.record(update, body);
                }
                if let Some(child) = node.child_by_field_name("body") {
                    self.statement(child, body);
                }
            }
            "enhanced_for_statement" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let ty = type_text(
                        node.child_by_field_name("type"),
                        node.child_by_field_name("dimensions"),
                        self.source,
                    );
                    body.local(ty, self.text(name));
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.record(value, body);
                }
                if let Some(child) = node.child_by_field_name("body") {
                    self.statement(child, body);
                }
            }
            "try_statement" | "try_with_resources_statement" => {
                if let Some(resources) = node.child_by_field_name("resources") {
                    for resource in named_children(resources) {
                        self.resource(resource, body);
                    }
                }
                if let Some(block) = node.child_by_field_name("body") {
                    self.statement(block, body);
                }
                for child in named_children(node) {
                    match child.kind() {
                        "catch_clause" => self.catch_clause(child, body),
                        "finally_clause" => self.statement(child, body),
                        _ => {}
                    }
                }
            }
            "return_statement" | "throw_statement" | "yield_statement" | "assert_statement" => {
                for child in named_children(node) {
                    self.record(child, body);
                }
            }
            "labeled_statement" => {
                for child in named_children(node) {
                    if child.kind() != "identifier" {
                        self.statement(child, body);
                    }
                }
            }
            "explicit_constructor_invocation" => {
                if let Some(arguments) = node.child_by_field_name("arguments") {
                    let args = named_children(arguments)
                        .into_iter()
                        .map(|arg| self.expr(arg, body))
                        .collect();
                    body.record(Expr::Other(args));
                    self.drain(body);
                }
            }
            "class_declaration" | "record_declaration" | "enum_declaration" | "interface_declaration" => {
                // Local classes: their methods run on behalf of the enclosing method.
                if let Some(class) = self.class(node) {
                    body.nested.extend(class.methods);
                }
            }
            _ => self.statement_or_expr(node, body),
        }
    }

    fn statement_or_expr<'t>(&self, node: Node<'t>, body: &mut Body<'t>) {
        if node.kind().ends_with("statement")
            || matches!(node.kind(), "block" | "local_variable_declaration")
        {
            self.statement(node, body);
        } else {
            self.record(node, body);
        }
    }

    fn resource<'t>(&self, resource: Node<'t>, body: &mut Body<'t>) {
        match (resource.child_by_field_name("name"), resource.child_by_field_name("value")) {
            (Some(name), value) => {
                let ty = type_text(resource.child_by_field_name("type"), None, self.source);
                body.local(ty, self.text(name));
                if let Some(value) = value {
                    self.record(value, body);
                }
            }
            (None, _) => {
                for child in named_children(resource) {
                    self.record(child, body);
                }
            }
        }
    }

    fn catch_clause<'t>(&self, clause: Node<'t>, body: &mut Body<'t>) {
        if let Some(param) = child_of_kind(clause, &["catch_formal_parameter"]) {
            let ty = child_of_kind(param, &["catch_type"])
                .and_then(|ty| named_children(ty).into_iter().next())
                .map(|ty| self.text(ty).to_string())
                .unwrap_or_else(|| "Exception".to_string());
            if let Some(name) = param.child_by_field_name("name") {
                body.local(ty, self.text(name));
            }
        }
        if let Some(block) = clause.child_by_field_name("body") {
            self.statement(block, body);
        }
    }

    fn args<'t>(&self, node: Option<Node<'t>>, body: &mut Body<'t>) -> Vec<Expr> {
        node.map(|arguments| {
            named_children(arguments)
                .into_iter()
                .filter(|arg| !arg.kind().ends_with("comment"))
                .map(|arg| self.expr(arg, body))
                .collect()
        })
        .unwrap_or_default()
    }

    fn operands<'t>(&self, node: Node<'t>, fields: &[&str], body: &mut Body<'t>) -> Vec<Expr> {
        fields
            .iter()
            .filter_map(|field| node.child_by_field_name(field))
            .map(|child| self.expr(child, body))
            .collect()
    }

    fn expr<'t>(&self, node: Node<'t>, body: &mut Body<'t>) -> Expr {
        match node.kind() {
            "method_invocation" => {
                let target = node
                    .child_by_field_name("object")
                    .map(|object| Box::new(self.expr(object, body)));
                let name = node
                    .child_by_field_name("name")
                    .map(|name| self.text(name).to_string())
                    .unwrap_or_default();
                let args = self.args(node.child_by_field_name("arguments"), body);
                Expr::Call { target, name, args }
            }
            "field_access" => {
                let target = node
                    .child_by_field_name("object")
                    .map(|object| self.expr(object, body))
                    .unwrap_or(Expr::This);
                let name = node
                    .child_by_field_name("field")
                    .map(|field| self.text(field))
                    .unwrap_or_default();
                Expr::member(target, name)
            }
            "identifier" => Expr::ident(self.text(node)),
            "this" => Expr::This,
            "super" => Expr::Super,
            "object_creation_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .map(|ty| self.text(ty))
                    .unwrap_or("Object");
                let args = self.args(node.child_by_field_name("arguments"), body);
                if let Some(class_body) = child_of_kind(node, &["class_body"]) {
                    let simple = ty.split('<').next().unwrap_or(ty).trim();
                    for member in named_children(class_body) {
                        if member.kind() == "method_declaration" {
                            body.nested.push(self.method(member, simple, false));
                        }
                    }
                }
                Expr::new_object(ty, args)
            }
            "array_creation_expression" => {
                let dims = field_children(node, "dimensions").len().max(1);
                let ty = node
                    .child_by_field_name("type")
                    .map(|ty| format!("{}{}", self.text(ty), "[]".repeat(dims)))
                    .unwrap_or_else(|| "Object[]".to_string());
                let elements = node
                    .child_by_field_name("value")
                    .map(|value| self.args(Some(value), body))
                    .unwrap_or_default();
                Expr::NewArray {
                    ty: TypeName::new(ty),
                    elements,
                }
            }
            "array_initializer" => Expr::Other(self.args(Some(node), body)),
            "cast_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .map(|ty| self.text(ty))
                    .unwrap_or("Object");
                let operand = node
                    .child_by_field_name("value")
                    .map(|value| self.expr(value, body))
                    .unwrap_or(Expr::Other(Vec::new()));
                Expr::Cast {
                    ty: TypeName::new(ty),
                    operand: Box::new(operand),
                }
            }
            "parenthesized_expression" => match named_children(node).into_iter().next() {
                Some(inner) => Expr::Paren(Box::new(self.expr(inner, body))),
                None => Expr::Other(Vec::new()),
            },
            "array_access" => {
                let target = node
                    .child_by_field_name("array")
                    .map(|array| self.expr(array, body))
                    .unwrap_or(Expr::Other(Vec::new()));
                let index = self.operands(node, &["index"], body);
                Expr::Index {
                    target: Box::new(target),
                    index,
                }
            }
            "decimal_integer_literal" | "octal_integer_literal" => Expr::Literal(LiteralKind::Integer),
            "hex_integer_literal" => Expr::Literal(LiteralKind::Hex),
            "binary_integer_literal" => Expr::Literal(LiteralKind::Binary),
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                Expr::Literal(LiteralKind::Real)
            }
            "character_literal" => Expr::Literal(LiteralKind::Char),
            "string_literal" | "text_block" => Expr::Literal(LiteralKind::String),
            "true" | "false" => Expr::Literal(LiteralKind::Boolean),
            "null_literal" => Expr::Literal(LiteralKind::Null),
            "binary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|op| self.text(op))
                    .unwrap_or("+");
                Expr::Operation {
                    kind: binary_kind(operator),
                    operands: self.operands(node, &["left", "right"], body),
                }
            }
            "unary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|op| self.text(op))
                    .unwrap_or("-");
                Expr::Operation {
                    kind: if operator == "!" {
                        OperationKind::Comparison
                    } else {
                        OperationKind::Arithmetic
                    },
                    operands: self.operands(node, &["operand"], body),
                }
            }
            "update_expression" => Expr::Operation {
                kind: OperationKind::Arithmetic,
                operands: self.args(Some(node), body),
            },
            "assignment_expression" => Expr::Operation {
                kind: OperationKind::Assignment,
                operands: self.operands(node, &["left", "right"], body),
            },
            "ternary_expression" => Expr::Operation {
                kind: OperationKind::Conditional,
                operands: self.operands(node, &["condition", "consequence", "alternative"], body),
            },
            "instanceof_expression" => Expr::Operation {
                kind: OperationKind::Comparison,
                operands: self.operands(node, &["left"], body),
            },
            "lambda_expression" => {
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.lambda_params(params, body);
                }
                if let Some(lambda_body) = node.child_by_field_name("body") {
                    body.defer(lambda_body);
                }
                Expr::Other(Vec::new())
            }
            "switch_expression" => {
                let condition = self.operands(node, &["condition"], body);
                if let Some(block) = node.child_by_field_name("body") {
                    body.defer(block);
                }
                Expr::Other(condition)
            }
            "class_literal" => {
                let ty = named_children(node)
                    .into_iter()
                    .next()
                    .map(|ty| self.text(ty))
                    .unwrap_or("Object");
                Expr::ClassLiteral(TypeName::new(ty))
            }
            "method_reference" => Expr::Other(Vec::new()),
            _ => Expr::Other(self.args(Some(node), body)),
        }
    }

    fn lambda_params<'t>(&self, params: Node<'t>, body: &mut Body<'t>) {
        match params.kind() {
            "identifier" => body.local("var", self.text(params)),
            "formal_parameters" => body.locals.extend(self.params(params)),
            _ => {
                for param in named_children(params) {
                    if param.kind() == "identifier" {
                        body.local("var", self.text(param));
                    }
                }
            }
        }
    }
}
