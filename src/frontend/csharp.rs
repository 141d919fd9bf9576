//! C# front end over `tree-sitter-c-sharp`.

use super::tree::{
    child_of_kind, field_children, guard_text, has_token, lock_initializer, named_children,
    operand_children, parse_tree, text, type_text, Body,
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
pub struct CSharpFrontend;

fn grammar() -> TsLanguage {
    tree_sitter_c_sharp::LANGUAGE.into()
}

const NAME_KINDS: &[&str] = &["identifier", "qualified_name", "generic_name", "alias_qualified_name"];

impl LanguageFrontend for CSharpFrontend {
    fn language(&self) -> Language {
        Language::CSharp
    }

    fn parse_unit(&self, path: &Path, source: &str) -> Result<CompilationUnit> {
        let tree = parse_tree(&grammar(), path, source)?;
        let mut unit = CompilationUnit::new(path, "");
        let walker = Walker { source };
        walker.namespace_members(tree.root_node(), "", &mut unit);
        debug!(path = %path.display(), classes = unit.classes.len(), "parsed c# unit");
        Ok(unit)
    }

    fn generate_expression(&self, text: &str) -> Option<Expr> {
        let source = format!("class __Probe {{ object __probe = ({text}); }}");
        let tree = parse_tree(&grammar(), Path::new("<expression>"), &source).ok()?;
        let class = child_of_kind(tree.root_node(), &["class_declaration"])?;
        let body = class
            .child_by_field_name("body")
            .or_else(|| child_of_kind(class, &["declaration_list"]))?;
        let field = child_of_kind(body, &["field_declaration"])?;
        let declaration = child_of_kind(field, &["variable_declaration"])?;
        let declarator = child_of_kind(declaration, &["variable_declarator"])?;
        let walker = Walker { source: &source };
        let value = walker.declarator_value(declarator)?;
        match walker.expr(value, &mut Body::new()) {
            Expr::Paren(inner) => Some(*inner),
            other => Some(other),
        }
    }

    fn lock_operation(&self, method: &str) -> Option<LockOperation> {
        if method.starts_with("Enter")
            || method.starts_with("TryEnter")
            || matches!(method, "WaitOne" | "Wait" | "WaitAsync")
        {
            Some(LockOperation::Acquire)
        } else if method.starts_with("Exit") || matches!(method, "ReleaseMutex" | "Release") {
            Some(LockOperation::Release)
        } else {
            None
        }
    }
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

    fn modifiers(&self, node: Node<'_>) -> Vec<&'s str> {
        named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "modifier")
            .map(|child| self.text(child))
            .collect()
    }

    fn namespace_members(&self, node: Node<'_>, namespace: &str, unit: &mut CompilationUnit) {
        let mut namespace = namespace.to_string();
        for child in named_children(node) {
            match child.kind() {
                "using_directive" => {
                    let Some(name) = named_children(child)
                        .into_iter()
                        .rev()
                        .find(|n| NAME_KINDS.contains(&n.kind()))
                    else {
                        continue;
                    };
                    let is_static = has_token(child, "static");
                    unit.imports.push(RawImport {
                        path: self.text(name).to_string(),
                        is_static,
                        // `using Namespace;` pulls in every type of the namespace,
                        // `using static Type;` every member of the type.
                        wildcard: true,
                    });
                }
                "namespace_declaration" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|name| self.text(name))
                        .unwrap_or_default();
                    let qualified = if namespace.is_empty() {
                        name.to_string()
                    } else {
                        format!("{namespace}.{name}")
                    };
                    if let Some(body) = child.child_by_field_name("body") {
                        self.namespace_members(body, &qualified, unit);
                    }
                }
                "file_scoped_namespace_declaration" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        namespace = self.text(name).to_string();
                        unit.package = namespace.clone();
                    }
                    self.namespace_members(child, &namespace, unit);
                }
                _ => {
                    if let Some(class) = self.class(child) {
                        if unit.package.is_empty() {
                            unit.package = namespace.clone();
                        }
                        unit.classes.push(class);
                    }
                }
            }
        }
    }

    fn class(&self, node: Node<'_>) -> Option<RawClass> {
        let kind = match node.kind() {
            "class_declaration" | "struct_declaration" | "record_declaration"
            | "record_struct_declaration" => ClassKind::Class,
            "interface_declaration" => ClassKind::Interface,
            "enum_declaration" => ClassKind::Enum,
            _ => return None,
        };
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let modifiers = self.modifiers(node);

        let mut class = RawClass::new(name);
        class.kind = kind;
        class.is_abstract = modifiers.contains(&"abstract");
        class.type_params = self.type_params(node);

        if let Some(bases) = child_of_kind(node, &["base_list"]) {
            for base in named_children(bases) {
                let ty = match base.kind() {
                    "primary_constructor_base_type" => named_children(base).into_iter().next(),
                    "argument_list" => None,
                    _ => Some(base),
                };
                if let Some(ty) = ty {
                    class.supertypes.push(self.text(ty).to_string());
                }
            }
        }
        if let Some(parameters) = child_of_kind(node, &["parameter_list"]) {
            class.fields.extend(self.params(parameters));
        }

        let body = node
            .child_by_field_name("body")
            .or_else(|| child_of_kind(node, &["declaration_list", "enum_member_declaration_list"]));
        if let Some(body) = body {
            self.members(body, &mut class);
        }
        Some(class)
    }

    fn type_params(&self, node: Node<'_>) -> Vec<String> {
        node.child_by_field_name("type_parameters")
            .or_else(|| child_of_kind(node, &["type_parameter_list"]))
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .filter(|param| param.kind() == "type_parameter")
                    .map(|param| {
                        param
                            .child_by_field_name("name")
                            .map(|name| self.text(name))
                            .unwrap_or_else(|| self.text(param))
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn members(&self, body: Node<'_>, class: &mut RawClass) {
        let mut events = 0usize;
        for member in named_children(body) {
            match member.kind() {
                "enum_member_declaration" => {
                    if let Some(name) = member.child_by_field_name("name") {
                        class.enum_constants.push(self.text(name).to_string());
                    }
                }
                "field_declaration" | "event_field_declaration" => {
                    if let Some(declaration) = child_of_kind(member, &["variable_declaration"]) {
                        class.fields.extend(self.variables(declaration, &mut Body::new()));
                    }
                }
                "property_declaration" => {
                    let ty = member.child_by_field_name("type");
                    let Some(name) = member.child_by_field_name("name") else {
                        continue;
                    };
                    let name = self.text(name);
                    class.fields.push(RawVariable::new(type_text(ty, None, self.source), name));
                    class.methods.extend(self.accessors(member, name));
                }
                "indexer_declaration" => {
                    class.methods.extend(self.accessors(member, "Item"));
                }
                "event_declaration" => {
                    for mut accessor in self.accessors(member, "") {
                        accessor.name = format!("event_{events}");
                        accessor.is_entry_point = true;
                        events += 1;
                        class.methods.push(accessor);
                    }
                }
                "method_declaration" | "constructor_declaration" | "destructor_declaration"
                | "operator_declaration" | "conversion_operator_declaration" => {
                    let interface = class.kind == ClassKind::Interface;
                    class.methods.push(self.method(member, &class.name, interface));
                }
                _ => {
                    if let Some(nested) = self.class(member) {
                        class.nested.push(nested);
                    }
                }
            }
        }
    }

    /// Accessor bodies of a property, indexer or event, as `get_Name` etc.
    fn accessors(&self, member: Node<'_>, name: &str) -> Vec<RawMethod> {
        let mut methods = Vec::new();
        if let Some(arrow) = member
            .child_by_field_name("value")
            .filter(|value| value.kind() == "arrow_expression_clause")
        {
            let mut body = Body::new();
            self.statement(arrow, &mut body);
            methods.push(body.into_method(RawMethod::new(format!("get_{name}"))));
        }
        let Some(list) = member
            .child_by_field_name("accessors")
            .or_else(|| child_of_kind(member, &["accessor_list"]))
        else {
            return methods;
        };
        for accessor in named_children(list) {
            if accessor.kind() != "accessor_declaration" {
                continue;
            }
            let Some(accessor_body) = accessor
                .child_by_field_name("body")
                .or_else(|| child_of_kind(accessor, &["block", "arrow_expression_clause"]))
            else {
                continue;
            };
            let keyword = accessor
                .child_by_field_name("name")
                .map(|keyword| self.text(keyword))
                .unwrap_or("get");
            let mut body = Body::new();
            let guarded = self.is_synchronized(accessor);
            self.guarded_body(accessor_body, guarded.then_some("this"), &mut body);
            let mut method = RawMethod::new(format!("{keyword}_{name}"));
            method.is_static = self.modifiers(member).contains(&"static");
            methods.push(body.into_method(method));
        }
        methods
    }

    fn is_synchronized(&self, node: Node<'_>) -> bool {
        named_children(node).into_iter().any(|child| {
            child.kind() == "attribute_list" && self.text(child).contains("MethodImplOptions.Synchronized")
        })
    }

    fn params(&self, parameters: Node<'_>) -> Vec<RawVariable> {
        named_children(parameters)
            .into_iter()
            .filter(|param| param.kind() == "parameter")
            .filter_map(|param| {
                let name = param.child_by_field_name("name")?;
                let mut ty = type_text(param.child_by_field_name("type"), None, self.source);
                if has_token(param, "params") && !ty.ends_with(']') {
                    ty.push_str("[]");
                }
                Some(RawVariable::new(ty, self.text(name)))
            })
            .collect()
    }

    fn declarator_value<'t>(&self, declarator: Node<'t>) -> Option<Node<'t>> {
        let name = declarator.child_by_field_name("name");
        named_children(declarator).into_iter().find_map(|child| {
            if Some(child) == name {
                return None;
            }
            match child.kind() {
                "equals_value_clause" => operand_children(child).into_iter().next(),
                "bracketed_argument_list" | "tuple_pattern" => None,
                "identifier" if name.is_none() => None,
                _ => Some(child),
            }
        })
    }

    /// Declarators of a `variable_declaration`; initializers are recorded into `body`.
    fn variables<'t>(&self, declaration: Node<'t>, body: &mut Body<'t>) -> Vec<RawVariable> {
        let ty = type_text(declaration.child_by_field_name("type"), None, self.source);
        let mut variables = Vec::new();
        for declarator in named_children(declaration) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = declarator
                .child_by_field_name("name")
                .or_else(|| child_of_kind(declarator, &["identifier"]))
            else {
                continue;
            };
            let mut variable = RawVariable::new(ty.clone(), self.text(name));
            if let Some(value) = self.declarator_value(declarator) {
                let expr = self.expr(value, body);
                variable.initializer = lock_initializer(&expr);
                body.record(expr);
                self.drain(body);
            }
            variables.push(variable);
        }
        variables
    }

    fn method(&self, node: Node<'_>, class_name: &str, in_interface: bool) -> RawMethod {
        let modifiers = self.modifiers(node);
        let name = node
            .child_by_field_name("name")
            .map(|name| self.text(name))
            .unwrap_or("operator");

        let mut method = match node.kind() {
            "constructor_declaration" => RawMethod::constructor(class_name),
            "destructor_declaration" => RawMethod::new("Finalize"),
            _ => {
                let returns = node
                    .child_by_field_name("returns")
                    .or_else(|| node.child_by_field_name("type"));
                RawMethod::new(name).returns(type_text(returns, None, self.source))
            }
        };
        method.type_params = self.type_params(node);
        method.is_static = modifiers.contains(&"static");
        if let Some(parameters) = node.child_by_field_name("parameters") {
            method.params = self.params(parameters);
        }

        let body_node = node
            .child_by_field_name("body")
            .or_else(|| child_of_kind(node, &["block", "arrow_expression_clause"]));
        method.is_abstract = modifiers.contains(&"abstract")
            || (body_node.is_none() && (in_interface || !modifiers.contains(&"extern")));

        let mut body = Body::new();
        if let Some(initializer) = child_of_kind(node, &["constructor_initializer"]) {
            self.record(initializer, &mut body);
        }
        let Some(body_node) = body_node else {
            return body.into_method(method);
        };
        let guard = if method.is_static {
            format!("typeof({class_name})")
        } else {
            "this".to_string()
        };
        let synchronized = self.is_synchronized(node);
        self.guarded_body(body_node, synchronized.then_some(guard.as_str()), &mut body);
        body.into_method(method)
    }

    fn guarded_body<'t>(&self, node: Node<'t>, guard: Option<&str>, body: &mut Body<'t>) {
        let Some(guard) = guard else {
            self.statement(node, body);
            return;
        };
        let (acquire, release) = body.sync_pair(guard);
        body.calls.push(acquire);
        self.statement(node, body);
        body.calls.push(release);
    }

    fn local_function(&self, node: Node<'_>) -> RawMethod {
        let name = node
            .child_by_field_name("name")
            .map(|name| self.text(name))
            .unwrap_or("local");
        let returns = node
            .child_by_field_name("type")
            .or_else(|| node.child_by_field_name("returns"));
        let mut method = RawMethod::new(name).returns(type_text(returns, None, self.source));
        method.type_params = self.type_params(node);
        method.is_static = self.modifiers(node).contains(&"static");
        if let Some(parameters) = node.child_by_field_name("parameters") {
            method.params = self.params(parameters);
        }
        let mut body = Body::new();
        if let Some(body_node) = node
            .child_by_field_name("body")
            .or_else(|| child_of_kind(node, &["block", "arrow_expression_clause"]))
        {
            self.statement(body_node, &mut body);
        }
        body.into_method(method)
    }

    fn record<'t>(&self, node: Node<'t>, body: &mut Body<'t>) {
        let expr = self.expr(node, body);
        body.record(expr);
        self.drain(body);
    }

    fn drain<'t>(&self, body: &mut Body<'t>) {
        while let Some(deferred) = body.deferred.pop_front() {
            if deferred.kind() == "block" {
                self.statement(deferred, body);
            } else {
                self.record(deferred, body);
            }
        }
    }

    fn statement<'t>(&self, node: Node<'t>, body: &mut Body<'t>) {
        match node.kind() {
            "block" | "switch_body" | "switch_section" | "checked_statement" | "unsafe_statement"
            | "finally_clause" | "arrow_expression_clause" => {
                for child in named_children(node) {
                    self.statement_or_expr(child, body);
                }
            }
            "comment" | "empty_statement" | "break_statement" | "continue_statement"
            | "goto_statement" => {}
            "local_declaration_statement" | "using_statement" | "fixed_statement" => {
                for child in named_children(node) {
                    match child.kind() {
                        "variable_declaration" => {
                            let locals = self.variables(child, body);
                            body.locals.extend(locals);
                        }
                        "modifier" => {}
                        _ => self.statement_or_expr(child, body),
                    }
                }
            }
            "variable_declaration" => {
                let locals = self.variables(node, body);
                body.locals.extend(locals);
            }
            "expression_statement" => {
                for child in named_children(node) {
                    self.record(child, body);
                }
            }
            "lock_statement" => {
                let children = operand_children(node);
                let guard = children.first().copied();
                let guard_text = guard
                    .map(|guard| guard_text(guard, self.source))
                    .unwrap_or_else(|| "this".to_string());
                if let Some(guard) = guard {
                    self.record(guard, body);
                }
                let (acquire, release) = body.sync_pair(&guard_text);
                body.calls.push(acquire);
                for statement in children.into_iter().skip(1) {
                    self.statement(statement, body);
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
                for field in ["initializer", "condition", "update"] {
                    for child in field_children(node, field) {
                        self.statement_or_expr(child, body);
                    }
                }
                if let Some(child) = node.child_by_field_name("body") {
                    self.statement(child, body);
                }
            }
            "foreach_statement" => {
                if let (Some(ty), Some(left)) =
                    (node.child_by_field_name("type"), node.child_by_field_name("left"))
                {
                    if left.kind() == "identifier" {
                        body.local(self.text(ty), self.text(left));
                    }
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.record(right, body);
                }
                if let Some(child) = node.child_by_field_name("body") {
                    self.statement(child, body);
                }
            }
            "try_statement" => {
                for child in named_children(node) {
                    match child.kind() {
                        "catch_clause" => self.catch_clause(child, body),
                        _ => self.statement(child, body),
                    }
                }
            }
            "return_statement" | "throw_statement" | "yield_statement" => {
                for child in named_children(node) {
                    self.record(child, body);
                }
            }
            "switch_statement" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.record(value, body);
                }
                if let Some(switch_body) = node.child_by_field_name("body") {
                    self.statement(switch_body, body);
                }
            }
            "labeled_statement" => {
                for child in named_children(node) {
                    if child.kind() != "identifier" {
                        self.statement(child, body);
                    }
                }
            }
            "local_function_statement" => {
                let function = self.local_function(node);
                body.nested.push(function);
            }
            _ => self.statement_or_expr(node, body),
        }
    }

    fn statement_or_expr<'t>(&self, node: Node<'t>, body: &mut Body<'t>) {
        let kind = node.kind();
        if kind.ends_with("_statement")
            || matches!(kind, "block" | "variable_declaration" | "switch_body" | "switch_section")
        {
            self.statement(node, body);
        } else if kind.ends_with("_label") || kind.ends_with("pattern") || kind == "comment" {
            // case labels and patterns
        } else {
            self.record(node, body);
        }
    }

    fn catch_clause<'t>(&self, clause: Node<'t>, body: &mut Body<'t>) {
        if let Some(declaration) = child_of_kind(clause, &["catch_declaration"]) {
            if let Some(name) = declaration.child_by_field_name("name") {
                let ty = type_text(declaration.child_by_field_name("type"), None, self.source);
                body.local(ty, self.text(name));
            }
        }
        if let Some(block) = clause.child_by_field_name("body") {
            self.statement(block, body);
        }
    }

    fn argument_nodes<'t>(&self, arguments: Option<Node<'t>>) -> Vec<Node<'t>> {
        let Some(arguments) = arguments else {
            return Vec::new();
        };
        named_children(arguments)
            .into_iter()
            .filter_map(|argument| match argument.kind() {
                "argument" => operand_children(argument).into_iter().last(),
                "comment" => None,
                _ => Some(argument),
            })
            .collect()
    }

    fn args<'t>(&self, arguments: Option<Node<'t>>, body: &mut Body<'t>) -> Vec<Expr> {
        self.argument_nodes(arguments)
            .into_iter()
            .map(|arg| self.expr(arg, body))
            .collect()
    }

    fn operands<'t>(&self, node: Node<'t>, fields: &[&str], body: &mut Body<'t>) -> Vec<Expr> {
        fields
            .iter()
            .filter_map(|field| node.child_by_field_name(field))
            .map(|child| self.expr(child, body))
            .collect()
    }

    fn children<'t>(&self, node: Node<'t>, body: &mut Body<'t>) -> Vec<Expr> {
        operand_children(node)
            .into_iter()
            .filter(|child| child.kind() != "comment")
            .map(|child| self.expr(child, body))
            .collect()
    }

    fn simple_name(&self, node: Node<'_>) -> &'s str {
        match node.kind() {
            "generic_name" => node
                .child_by_field_name("name")
                .or_else(|| child_of_kind(node, &["identifier"]))
                .map(|name| self.text(name))
                .unwrap_or_else(|| self.text(node)),
            "member_binding_expression" => node
                .child_by_field_name("name")
                .map(|name| self.simple_name(name))
                .unwrap_or_default(),
            _ => self.text(node),
        }
    }

    fn invocation<'t>(&self, node: Node<'t>, body: &mut Body<'t>) -> Expr {
        let arguments = node.child_by_field_name("arguments");
        let Some(function) = node.child_by_field_name("function") else {
            return Expr::Other(self.args(arguments, body));
        };

        match function.kind() {
            "member_access_expression" => {
                let receiver = function.child_by_field_name("expression");
                let name = function
                    .child_by_field_name("name")
                    .map(|name| self.simple_name(name))
                    .unwrap_or_default();
                let receiver_text = receiver.map(|r| self.text(r)).unwrap_or_default();
                if (receiver_text == "Monitor" || receiver_text.ends_with(".Monitor"))
                    && matches!(name, "Enter" | "TryEnter" | "Exit")
                {
                    if let Some(guard) = self.argument_nodes(arguments).first() {
                        return body.sync_call(&guard_text(*guard, self.source), name != "Exit");
                    }
                }
                let target = receiver
                    .map(|receiver| self.expr(receiver, body))
                    .unwrap_or(Expr::This);
                let args = self.args(arguments, body);
                Expr::method(target, name, args)
            }
            "conditional_access_expression" => {
                let target = function
                    .child_by_field_name("condition")
                    .or_else(|| named_children(function).into_iter().next())
                    .map(|condition| self.expr(condition, body))
                    .unwrap_or(Expr::This);
                let name = child_of_kind(function, &["member_binding_expression"])
                    .map(|binding| self.simple_name(binding))
                    .unwrap_or("Invoke");
                let args = self.args(arguments, body);
                Expr::method(target, name, args)
            }
            "identifier" | "generic_name" => {
                let name = self.simple_name(function);
                let args = self.args(arguments, body);
                Expr::call(name, args)
            }
            _ => {
                let target = self.expr(function, body);
                let args = self.args(arguments, body);
                Expr::method(target, "Invoke", args)
            }
        }
    }

    fn expr<'t>(&self, node: Node<'t>, body: &mut Body<'t>) -> Expr {
        match node.kind() {
            "invocation_expression" => self.invocation(node, body),
            "member_access_expression" => {
                let target = node
                    .child_by_field_name("expression")
                    .map(|target| self.expr(target, body))
                    .unwrap_or(Expr::This);
                let name = node
                    .child_by_field_name("name")
                    .map(|name| self.simple_name(name))
                    .unwrap_or_default();
                Expr::member(target, name)
            }
            "conditional_access_expression" => {
                let target = node
                    .child_by_field_name("condition")
                    .or_else(|| named_children(node).into_iter().next())
                    .map(|condition| self.expr(condition, body))
                    .unwrap_or(Expr::This);
                match child_of_kind(node, &["member_binding_expression"]) {
                    Some(binding) => Expr::member(target, self.simple_name(binding)),
                    None => Expr::Other(vec![target]),
                }
            }
            "identifier" | "predefined_type" => Expr::ident(self.text(node)),
            "generic_name" => Expr::ident(self.simple_name(node)),
            "this" | "this_expression" => Expr::This,
            "base" | "base_expression" => Expr::Super,
            "object_creation_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .map(|ty| self.text(ty))
                    .unwrap_or("object");
                let args = self.args(node.child_by_field_name("arguments"), body);
                let created = Expr::new_object(ty, args);
                match node.child_by_field_name("initializer") {
                    Some(initializer) => {
                        let init = self.expr(initializer, body);
                        if init.contains_invocation() {
                            Expr::Other(vec![created, init])
                        } else {
                            created
                        }
                    }
                    None => created,
                }
            }
            "implicit_object_creation_expression" => {
                let args = self.args(child_of_kind(node, &["argument_list"]), body);
                Expr::new_object("var", args)
            }
            "array_creation_expression" | "implicit_array_creation_expression"
            | "stackalloc_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .map(|ty| self.text(ty))
                    .unwrap_or("object[]");
                let elements = node
                    .child_by_field_name("initializer")
                    .or_else(|| child_of_kind(node, &["initializer_expression"]))
                    .map(|init| self.children(init, body))
                    .unwrap_or_default();
                Expr::NewArray {
                    ty: TypeName::new(ty),
                    elements,
                }
            }
            "element_access_expression" => {
                let target = node
                    .child_by_field_name("expression")
                    .map(|target| self.expr(target, body))
                    .unwrap_or(Expr::This);
                let index = self.args(node.child_by_field_name("subscript"), body);
                Expr::Index {
                    target: Box::new(target),
                    index,
                }
            }
            "cast_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .map(|ty| self.text(ty))
                    .unwrap_or("object");
                let operand = node
                    .child_by_field_name("value")
                    .map(|value| self.expr(value, body))
                    .unwrap_or(Expr::Other(Vec::new()));
                Expr::Cast {
                    ty: TypeName::new(ty),
                    operand: Box::new(operand),
                }
            }
            "as_expression" => {
                let ty = node
                    .child_by_field_name("right")
                    .map(|ty| self.text(ty))
                    .unwrap_or("object");
                let operand = node
                    .child_by_field_name("left")
                    .map(|left| self.expr(left, body))
                    .unwrap_or(Expr::Other(Vec::new()));
                Expr::Cast {
                    ty: TypeName::new(ty),
                    operand: Box::new(operand),
                }
            }
            "parenthesized_expression" => match operand_children(node).into_iter().next() {
                Some(inner) => Expr::Paren(Box::new(self.expr(inner, body))),
                None => Expr::Other(Vec::new()),
            },
            "await_expression" => match operand_children(node).into_iter().next() {
                Some(inner) => self.expr(inner, body),
                None => Expr::Other(Vec::new()),
            },
            "integer_literal" => Expr::Literal(LiteralKind::Integer),
            "real_literal" => Expr::Literal(LiteralKind::Real),
            "character_literal" => Expr::Literal(LiteralKind::Char),
            "string_literal" | "verbatim_string_literal" | "raw_string_literal" => {
                Expr::Literal(LiteralKind::String)
            }
            "interpolated_string_expression" => {
                let mut operands = vec![Expr::Literal(LiteralKind::String)];
                for interpolation in named_children(node) {
                    if interpolation.kind() == "interpolation" {
                        operands.extend(self.children(interpolation, body));
                    }
                }
                Expr::Operation {
                    kind: OperationKind::Arithmetic,
                    operands,
                }
            }
            "boolean_literal" | "true" | "false" => Expr::Literal(LiteralKind::Boolean),
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
            "prefix_unary_expression" | "postfix_unary_expression" => {
                let negation = self.text(node).trim_start().starts_with('!');
                Expr::Operation {
                    kind: if negation {
                        OperationKind::Comparison
                    } else {
                        OperationKind::Arithmetic
                    },
                    operands: self.children(node, body),
                }
            }
            "assignment_expression" => Expr::Operation {
                kind: OperationKind::Assignment,
                operands: self.operands(node, &["left", "right"], body),
            },
            "conditional_expression" => Expr::Operation {
                kind: OperationKind::Conditional,
                operands: self.operands(node, &["condition", "consequence", "alternative"], body),
            },
            "is_expression" | "is_pattern_expression" => Expr::Operation {
                kind: OperationKind::Comparison,
                operands: self.operands(node, &["left", "expression"], body),
            },
            "typeof_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .or_else(|| named_children(node).into_iter().next())
                    .map(|ty| self.text(ty))
                    .unwrap_or("object");
                Expr::ClassLiteral(TypeName::new(ty))
            }
            "lambda_expression" | "anonymous_method_expression" => {
                if let Some(params) = node
                    .child_by_field_name("parameters")
                    .or_else(|| child_of_kind(node, &["parameter_list"]))
                {
                    self.lambda_params(params, body);
                }
                if let Some(lambda_body) = node
                    .child_by_field_name("body")
                    .or_else(|| child_of_kind(node, &["block"]))
                {
                    body.defer(lambda_body);
                }
                Expr::Other(Vec::new())
            }
            "declaration_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let ty = type_text(node.child_by_field_name("type"), None, self.source);
                    body.local(ty, self.text(name));
                    Expr::ident(self.text(name))
                } else {
                    Expr::Other(Vec::new())
                }
            }
            _ => Expr::Other(self.children(node, body)),
        }
    }

    fn lambda_params<'t>(&self, params: Node<'t>, body: &mut Body<'t>) {
        match params.kind() {
            "identifier" => body.local("var", self.text(params)),
            _ => {
                for param in named_children(params) {
                    if param.kind() != "parameter" {
                        continue;
                    }
                    if let Some(name) = param.child_by_field_name("name") {
                        let ty = type_text(param.child_by_field_name("type"), None, self.source);
                        body.local(ty, self.text(name));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> CompilationUnit {
        CSharpFrontend
            .parse_unit(Path::new("Test.cs"), source)
            .expect("source parses")
    }

    fn calls(method: &RawMethod) -> Vec<String> {
        method.calls.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_namespace_usings_and_class_shape() {
        let unit = parse(indoc! {r#"
            using System.Threading;
            using static Bank.Color;

            namespace Bank
            {
                public abstract class Account<T> : Base, IComparable
                {
                    private readonly object gate = new object();
                    public int Balance { get; set; }
                    public abstract void Audit();
                }
            }
        "#});
        assert_eq!(unit.package, "Bank");
        assert_eq!(unit.imports.len(), 2);
        assert_eq!(unit.imports[0].path, "System.Threading");
        assert!(unit.imports[1].is_static);

        let class = &unit.classes[0];
        assert_eq!(class.name, "Account");
        assert!(class.is_abstract);
        assert_eq!(class.type_params, vec!["T".to_string()]);
        assert_eq!(class.supertypes, vec!["Base".to_string(), "IComparable".to_string()]);
        let fields: Vec<&str> = class.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["gate", "Balance"]);
        assert!(class.methods.iter().any(|m| m.name == "Audit" && m.is_abstract));
    }

    #[test]
    fn test_lock_statement_lowering() {
        let unit = parse(indoc! {r#"
            class Transfer
            {
                private readonly object a = new object();
                void Move(Account other)
                {
                    lock (a)
                    {
                        other.Deposit(1);
                    }
                }
            }
        "#});
        let method = &unit.classes[0].methods[0];
        assert_eq!(
            calls(method),
            vec!["synchLock_a_0.lock()", "other.Deposit(<Integer>)", "synchLock_a_0.unlock()"]
        );
    }

    #[test]
    fn test_monitor_enter_exit_lowering() {
        let unit = parse(indoc! {r#"
            class Gate
            {
                void Pass()
                {
                    Monitor.Enter(this);
                    Work();
                    Monitor.Exit(this);
                }
                void Work() {}
            }
        "#});
        assert_eq!(
            calls(&unit.classes[0].methods[0]),
            vec!["synchLock_this_0.lock()", "Work()", "synchLock_this_1.unlock()"]
        );
    }

    #[test]
    fn test_this_as_argument_and_lock_guard() {
        let unit = parse(indoc! {r#"
            class Node
            {
                void Join(Registry reg)
                {
                    lock (this)
                    {
                        reg.Accept(this, (this));
                    }
                }
            }
        "#});
        assert_eq!(
            calls(&unit.classes[0].methods[0]),
            vec![
                "synchLock_this_0.lock()",
                "reg.Accept(this, (this))",
                "synchLock_this_0.unlock()"
            ]
        );
    }

    #[test]
    fn test_reader_writer_lock_calls() {
        let unit = parse(indoc! {r#"
            class Cache
            {
                private ReaderWriterLockSlim rw = new ReaderWriterLockSlim();
                string Read(string key)
                {
                    rw.EnterReadLock();
                    try { return Lookup(key); }
                    finally { rw.ExitReadLock(); }
                }
                string Lookup(string key) => key;
            }
        "#});
        let read = &unit.classes[0].methods[0];
        assert_eq!(
            calls(read),
            vec!["rw.EnterReadLock()", "Lookup(key)", "rw.ExitReadLock()"]
        );
        assert_eq!(CSharpFrontend.lock_operation("EnterReadLock"), Some(LockOperation::Acquire));
        assert_eq!(CSharpFrontend.lock_operation("ExitWriteLock"), Some(LockOperation::Release));
        assert_eq!(CSharpFrontend.lock_operation("Deposit"), None);
    }

    #[test]
    fn test_event_accessors_are_entry_points() {
        let unit = parse(indoc! {r#"
            class Feed
            {
                private EventHandler handler;
                public event EventHandler Changed
                {
                    add { Register(value); }
                    remove { Unregister(value); }
                }
                void Register(EventHandler h) {}
                void Unregister(EventHandler h) {}
            }
        "#});
        let methods = &unit.classes[0].methods;
        let events: Vec<&RawMethod> = methods.iter().filter(|m| m.is_entry_point).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "event_0");
        assert_eq!(events[1].name, "event_1");
    }

    #[test]
    fn test_local_function_and_lambda() {
        let unit = parse(indoc! {r#"
            class Runner
            {
                void Start(TaskFactory factory)
                {
                    factory.StartNew(() => { Step(); });
                    void Step() { Finish(); }
                }
                void Finish() {}
            }
        "#});
        let start = &unit.classes[0].methods[0];
        assert_eq!(calls(start), vec!["factory.StartNew(<expr>)", "Step()"]);
        assert_eq!(start.nested.len(), 1);
        assert_eq!(start.nested[0].name, "Step");
    }

    #[test]
    fn test_enum_members() {
        let unit = parse("enum Color { Red, Green = 2 }");
        assert_eq!(unit.classes[0].kind, ClassKind::Enum);
        assert_eq!(
            unit.classes[0].enum_constants,
            vec!["Red".to_string(), "Green".to_string()]
        );
    }

    #[test]
    fn test_generate_expression() {
        assert_eq!(CSharpFrontend.generate_expression("this"), Some(Expr::This));
        assert_eq!(
            CSharpFrontend.generate_expression("_sync"),
            Some(Expr::ident("_sync"))
        );
        assert!(matches!(
            CSharpFrontend.generate_expression("typeof(Gate)"),
            Some(Expr::ClassLiteral(_))
        ));
    }
}
