//! Parser for Murk
//!
//! Walks the token stream statement by statement. Function bodies are tagged
//! with the function's name and parsed by a nested parser; file imports are
//! lexed and parsed here so the interpreter only ever sees finished programs.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::ast::{
    AssignTarget, Call, Expr, FunctionDecl, ModuleAccess, Node, NodeKind, Param, Program, SourceFile,
};
use crate::error::{ErrorKind, MurkError, Result};
use crate::lexer::lex;
use crate::module::{Imports, ModuleRegistry};
use crate::token::{Keyword, Span, Token, TokenKind, FILE_EXTENSION};
use crate::value::ValueType;

/// The parser state
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    registry: Rc<dyn ModuleRegistry>,
    base_path: PathBuf,
    /// Files whose parse is in progress, outermost first
    importing: Vec<PathBuf>,
    imports: Imports,
    /// The imported file being parsed, `None` for the entry program
    file: Option<Rc<SourceFile>>,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>, registry: Rc<dyn ModuleRegistry>) -> Self {
        Self {
            tokens,
            current: 0,
            registry,
            base_path: PathBuf::from("."),
            importing: Vec::new(),
            imports: Imports::new(),
            file: None,
        }
    }

    /// Resolve file imports relative to `base_path`
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Parse on behalf of the file at `path`: imports resolve next to it and
    /// importing it again from below is reported as a cycle
    pub fn with_source_path(mut self, path: &Path) -> Self {
        self.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        self.importing.push(canonical(path));
        self
    }

    /// Parse the tokens into a program
    pub fn parse(&mut self) -> Result<Program> {
        let mut nodes = Vec::new();

        while !self.is_at_end() {
            nodes.push(self.statement()?);
        }

        Ok(Program::new(nodes, std::mem::take(&mut self.imports)))
    }

    fn nested(&self, tokens: Vec<Token>) -> Parser {
        Parser {
            tokens,
            current: 0,
            registry: Rc::clone(&self.registry),
            base_path: self.base_path.clone(),
            importing: self.importing.clone(),
            imports: Imports::new(),
            file: self.file.clone(),
        }
    }

    // ==================== Statements ====================

    fn statement(&mut self) -> Result<Node> {
        let token = self.peek_token()?.clone();

        match token.keyword() {
            Some(Keyword::Import) => return self.import_declaration(false),
            Some(Keyword::Export) => return self.export_declaration(),
            Some(Keyword::Function) => return self.function_declaration(false),
            Some(Keyword::Var) => return self.var_declaration(),
            Some(Keyword::Return) => return self.return_statement(),
            None => {}
        }

        if token.kind == TokenKind::Identifier {
            match self.peek_next().map(|t| t.kind) {
                Some(TokenKind::LeftParen) => return self.call_statement(),
                Some(TokenKind::Dot) => return self.module_statement(),
                Some(TokenKind::Equal) => return self.assignment(),
                _ => {}
            }
        }

        Err(MurkError::at(ErrorKind::UnexpectedToken(token.lexeme), token.span))
    }

    fn import_declaration(&mut self, exported: bool) -> Result<Node> {
        let keyword = self.advance_token()?; // consume 'import'

        let target = self.advance_token()?;
        if target.kind != TokenKind::String {
            return Err(MurkError::at(ErrorKind::ExpectedString(target.lexeme), target.span));
        }
        let name = target.lexeme.clone();

        let builtin = self.registry.resolve(&name);
        let file = if name.ends_with(FILE_EXTENSION) {
            let path = self.base_path.join(&name);
            path.is_file().then_some(path)
        } else {
            None
        };

        let kind = match (builtin, file) {
            (Some(module), None) => {
                debug!(module = %module.name, "resolved built-in import");
                self.imports.insert(Rc::clone(&module));
                NodeKind::Import { module }
            }
            (None, Some(path)) => self.import_file(path, &target)?,
            (Some(_), Some(_)) => {
                return Err(MurkError::at(ErrorKind::AmbiguousImport(name), target.span));
            }
            (None, None) => {
                return Err(MurkError::at(ErrorKind::ModuleNotFound(name), target.span));
            }
        };

        let mut node = Node::new(kind, &keyword);
        node.exported = exported;
        Ok(node)
    }

    /// Lex and parse an imported file, keeping only what it exports
    fn import_file(&self, path: PathBuf, target: &Token) -> Result<NodeKind> {
        let key = canonical(&path);
        if self.importing.contains(&key) {
            return Err(MurkError::at(
                ErrorKind::CircularImport(target.lexeme.clone()),
                target.span,
            ));
        }

        let source = fs::read_to_string(&path).map_err(|err| {
            MurkError::at(
                ErrorKind::Io(format!("cannot read \"{}\": {}", path.display(), err)),
                target.span,
            )
        })?;

        let tokens = lex(&source).map_err(|err| err.in_file(&path, &source))?;
        let file = Rc::new(SourceFile {
            path: path.clone(),
            source: Rc::from(source.as_str()),
        });
        let mut parser = self.nested(tokens).with_source_path(&path);
        parser.file = Some(Rc::clone(&file));
        let program = parser.parse().map_err(|err| err.in_file(&path, &source))?;

        let imports = program.imports;
        let nodes: Vec<Node> = program.nodes.into_iter().filter(|node| node.exported).collect();
        if nodes.is_empty() {
            return Err(MurkError::at(
                ErrorKind::NoExports(target.lexeme.clone()),
                target.span,
            ));
        }

        debug!(path = %path.display(), exported = nodes.len(), "parsed imported file");
        Ok(NodeKind::FileImport {
            file,
            program: Program::new(nodes, imports),
        })
    }

    fn export_declaration(&mut self) -> Result<Node> {
        let keyword = self.advance_token()?; // consume 'export'

        match self.peek().and_then(Token::keyword) {
            Some(Keyword::Import) => self.import_declaration(true),
            Some(Keyword::Function) => self.function_declaration(true),
            _ => {
                let (got, span) = match self.peek() {
                    Some(token) => (token.lexeme.clone(), token.span),
                    None => ("end of input".to_string(), keyword.span),
                };
                Err(MurkError::at(ErrorKind::InvalidExport(got), span))
            }
        }
    }

    fn function_declaration(&mut self, exported: bool) -> Result<Node> {
        let keyword = self.advance_token()?; // consume 'function'
        if let Some(scope) = &keyword.scope {
            return Err(MurkError::at(
                ErrorKind::NestedFunction(scope.to_string()),
                keyword.span,
            ));
        }

        let name = self.expect_name("function name")?;
        self.expect(TokenKind::LeftParen, "\"(\" after function name")?;
        let params = self.parameters()?;
        self.expect(TokenKind::LeftBrace, "\"{\" before function body")?;

        // The body runs to the first '}'; a nested declaration would be
        // rejected by the body's own parser before it could need one.
        let body_start = self.current;
        let body_end = self.tokens[body_start..]
            .iter()
            .position(|t| t.kind == TokenKind::RightBrace)
            .map(|offset| body_start + offset)
            .ok_or_else(|| {
                MurkError::at(
                    ErrorKind::ExpectedToken("\"}\" after function body".into(), "end of input".into()),
                    self.last_span(),
                )
            })?;

        let scope: Rc<str> = Rc::from(name.lexeme.as_str());
        for token in &mut self.tokens[body_start..body_end] {
            token.scope = Some(Rc::clone(&scope));
        }
        let body_tokens = self.tokens[body_start..body_end].to_vec();
        self.current = body_end + 1;

        let body = self.nested(body_tokens).parse()?;

        let decl = FunctionDecl {
            name: name.lexeme,
            params,
            body,
            span: name.span,
            file: self.file.clone(),
        };

        let mut node = Node::new(NodeKind::FunctionDecl(Rc::new(decl)), &keyword);
        node.exported = exported;
        Ok(node)
    }

    /// Parameter list after '(': `name` or `name: Type`, comma separated
    fn parameters(&mut self) -> Result<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        if self.match_kind(TokenKind::RightParen) {
            return Ok(params);
        }

        loop {
            let token = self.advance_token()?;
            if !token.is_identifier() {
                return Err(MurkError::at(ErrorKind::InvalidParameter(token.lexeme), token.span));
            }
            if params.iter().any(|p| p.name == token.lexeme) {
                return Err(MurkError::at(ErrorKind::AlreadyDeclared(token.lexeme), token.span));
            }

            let ty = if self.match_kind(TokenKind::Colon) {
                let ty = self.advance_token()?;
                let resolved = ValueType::from_name(&ty.lexeme)
                    .ok_or_else(|| MurkError::at(ErrorKind::UnknownType(ty.lexeme.clone()), ty.span))?;
                Some(resolved)
            } else {
                None
            };
            params.push(Param { name: token.lexeme, ty });

            let separator = self.advance_token()?;
            match separator.kind {
                TokenKind::Comma => continue,
                TokenKind::RightParen => break,
                _ => {
                    return Err(MurkError::at(
                        ErrorKind::ExpectedToken("\",\" or \")\" in parameter list".into(), separator.lexeme),
                        separator.span,
                    ));
                }
            }
        }

        Ok(params)
    }

    fn var_declaration(&mut self) -> Result<Node> {
        let keyword = self.advance_token()?; // consume 'var'
        let name = self.expect_name("variable name")?;
        self.expect(TokenKind::Equal, "\"=\" after variable name")?;
        let value = self.value()?;

        Ok(Node::new(NodeKind::VarDecl { name: name.lexeme, value }, &keyword))
    }

    fn return_statement(&mut self) -> Result<Node> {
        let keyword = self.advance_token()?; // consume 'return'
        if keyword.scope.is_none() {
            return Err(MurkError::at(ErrorKind::ReturnOutsideFunction, keyword.span));
        }
        let value = self.value()?;

        Ok(Node::new(NodeKind::Return(value), &keyword))
    }

    fn call_statement(&mut self) -> Result<Node> {
        let name = self.advance_token()?;
        let call = self.call(name.clone())?;
        Ok(Node::new(NodeKind::Call(call), &name))
    }

    /// `Module.field`, `Module.field(args)` or `map.field = value`
    fn module_statement(&mut self) -> Result<Node> {
        let name = self.advance_token()?;
        let access = self.module_access(&name)?;

        if access.args.is_none() && self.match_kind(TokenKind::Equal) {
            let value = self.value()?;
            let target = AssignTarget::Field {
                map: access.module,
                field: access.field,
            };
            return Ok(Node::new(NodeKind::Assign { target, value }, &name));
        }

        Ok(Node::new(NodeKind::ModuleAccess(access), &name))
    }

    fn assignment(&mut self) -> Result<Node> {
        let name = self.advance_token()?;
        self.expect(TokenKind::Equal, "\"=\" after variable name")?;
        let value = self.value()?;

        let target = AssignTarget::Variable(name.lexeme.clone());
        Ok(Node::new(NodeKind::Assign { target, value }, &name))
    }

    // ==================== Values ====================

    /// Right-hand side of `=` or `return`
    fn value(&mut self) -> Result<Expr> {
        let Some(token) = self.advance() else {
            return Err(MurkError::at(
                ErrorKind::ExpectedValue("end of input".into()),
                self.last_span(),
            ));
        };

        if token.kind.is_literal() {
            return Ok(Expr::Literal(token));
        }

        if token.is_identifier() {
            return match self.peek().map(|t| t.kind) {
                Some(TokenKind::LeftParen) => Ok(Expr::Call(self.call(token)?)),
                Some(TokenKind::Dot) => Ok(Expr::Module(self.module_access(&token)?)),
                _ => Ok(Expr::Reference(token)),
            };
        }

        Err(MurkError::at(ErrorKind::ExpectedValue(token.lexeme), token.span))
    }

    /// `name(args)` with `name` already consumed
    fn call(&mut self, name: Token) -> Result<Call> {
        self.expect(TokenKind::LeftParen, "\"(\" after function name")?;
        let args = self.arguments()?;
        Ok(Call {
            name: name.lexeme,
            args,
            span: name.span,
        })
    }

    /// `.field` or `.field(args)` after a module or map name
    fn module_access(&mut self, name: &Token) -> Result<ModuleAccess> {
        self.expect(TokenKind::Dot, "\".\" after module name")?;
        let field = self.advance_token()?;
        if !field.is_identifier() {
            return Err(MurkError::at(
                ErrorKind::ExpectedToken("identifier after \".\"".into(), field.lexeme),
                field.span,
            ));
        }

        let args = if self.match_kind(TokenKind::LeftParen) {
            Some(self.arguments()?)
        } else {
            None
        };

        Ok(ModuleAccess {
            module: name.lexeme.clone(),
            field: field.lexeme,
            args,
            span: name.span,
        })
    }

    /// Argument list after '(': literals or identifiers, comma separated
    fn arguments(&mut self) -> Result<Vec<Token>> {
        let mut args = Vec::new();
        if self.match_kind(TokenKind::RightParen) {
            return Ok(args);
        }

        loop {
            let Some(token) = self.advance() else {
                return Err(MurkError::at(ErrorKind::UnterminatedArguments, self.last_span()));
            };
            if !token.kind.is_operand() || token.keyword().is_some() {
                return Err(MurkError::at(ErrorKind::InvalidArgument(token.lexeme), token.span));
            }
            args.push(token);

            let Some(separator) = self.advance() else {
                return Err(MurkError::at(ErrorKind::UnterminatedArguments, self.last_span()));
            };
            match separator.kind {
                TokenKind::Comma => continue,
                TokenKind::RightParen => break,
                _ => {
                    return Err(MurkError::at(
                        ErrorKind::ExpectedToken("\",\" or \")\" in argument list".into(), separator.lexeme),
                        separator.span,
                    ));
                }
            }
        }

        Ok(args)
    }

    // ==================== Helpers ====================

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    fn peek_token(&self) -> Result<&Token> {
        self.peek().ok_or_else(|| {
            MurkError::at(
                ErrorKind::UnexpectedToken("end of input".into()),
                self.last_span(),
            )
        })
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned()?;
        self.current += 1;
        Some(token)
    }

    /// Consume the next token, failing at end of input
    fn advance_token(&mut self) -> Result<Token> {
        let span = self.last_span();
        self.advance().ok_or_else(|| {
            MurkError::at(
                ErrorKind::UnexpectedToken("end of input".into()),
                span,
            )
        })
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.peek().map(|t| t.kind) == Some(kind) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(MurkError::at(
                ErrorKind::ExpectedToken(expected.to_string(), token.lexeme),
                token.span,
            )),
            None => Err(MurkError::at(
                ErrorKind::ExpectedToken(expected.to_string(), "end of input".into()),
                self.last_span(),
            )),
        }
    }

    /// An identifier that is not a reserved word
    fn expect_name(&mut self, expected: &str) -> Result<Token> {
        let token = self.expect(TokenKind::Identifier, expected)?;
        if token.keyword().is_some() {
            return Err(MurkError::at(ErrorKind::ReservedWord(token.lexeme), token.span));
        }
        Ok(token)
    }

    fn last_span(&self) -> Span {
        self.tokens
            .get(self.current.min(self.tokens.len()).saturating_sub(1))
            .map(|t| t.span)
            .unwrap_or_default()
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Builtins;

    fn parse(source: &str) -> Result<Program> {
        let tokens = lex(source)?;
        Parser::new(tokens, Rc::new(Builtins::default())).parse()
    }

    fn parse_ok(source: &str) -> Program {
        parse(source).expect("parse failed")
    }

    fn parse_err(source: &str) -> ErrorKind {
        parse(source).expect_err("expected a parse error").kind
    }

    #[test]
    fn test_var_declaration() {
        let program = parse_ok("var x = \"5\"");
        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0].kind {
            NodeKind::VarDecl { name, value: Expr::Literal(token) } => {
                assert_eq!(name, "x");
                assert_eq!(token.kind, TokenKind::String);
                assert_eq!(token.lexeme, "5");
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_module_call_value() {
        let program = parse_ok("import \"Number\"\nvar y = Number.parse(x)");
        assert_eq!(program.imports.len(), 1);
        match &program.nodes[1].kind {
            NodeKind::VarDecl { value: Expr::Module(access), .. } => {
                assert_eq!(access.qualified_name(), "Number.parse");
                let args = access.args.as_ref().expect("call arguments");
                assert_eq!(args.len(), 1);
                assert_eq!(args[0].lexeme, "x");
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_function_body_is_nested_and_scoped() {
        let program = parse_ok(
            r#"
            function greet(name: String, times) {
                var message = name
                return message
            }
            greet("hi", 2)
            "#,
        );
        assert_eq!(program.nodes.len(), 2);

        let NodeKind::FunctionDecl(decl) = &program.nodes[0].kind else {
            panic!("expected a function declaration");
        };
        assert_eq!(decl.name, "greet");
        assert_eq!(
            decl.params,
            vec![
                Param { name: "name".into(), ty: Some(ValueType::String) },
                Param { name: "times".into(), ty: None },
            ]
        );
        assert_eq!(decl.body.nodes.len(), 2);
        for node in &decl.body.nodes {
            assert_eq!(node.scope.as_deref(), Some("greet"));
        }
        assert!(program.nodes[1].scope.is_none());
        assert!(matches!(program.nodes[1].kind, NodeKind::Call(_)));
    }

    #[test]
    fn test_map_field_assignment() {
        let program = parse_ok("settings.level = 3");
        assert!(matches!(
            &program.nodes[0].kind,
            NodeKind::Assign { target: AssignTarget::Field { map, field }, .. }
                if map == "settings" && field == "level"
        ));
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(parse_err("var x = 1\nreturn x"), ErrorKind::ReturnOutsideFunction);
    }

    #[test]
    fn test_nested_function_rejected() {
        let kind = parse_err("function outer() {\n function inner() { return 1 }\n}");
        assert_eq!(kind, ErrorKind::NestedFunction("outer".into()));
    }

    #[test]
    fn test_invalid_export() {
        assert_eq!(parse_err("export var x = 1"), ErrorKind::InvalidExport("var".into()));
    }

    #[test]
    fn test_exported_function_is_flagged() {
        let program = parse_ok("export function f() { return 1 }");
        assert!(program.nodes[0].exported);
    }

    #[test]
    fn test_malformed_arguments() {
        assert!(matches!(parse_err("f(a b)"), ErrorKind::ExpectedToken(_, got) if got == "b"));
        assert_eq!(parse_err("f(a, )"), ErrorKind::InvalidArgument(")".into()));
        assert_eq!(parse_err("f(a, b"), ErrorKind::UnterminatedArguments);
    }

    #[test]
    fn test_malformed_parameters() {
        assert_eq!(
            parse_err("function f(a b) { return a }"),
            ErrorKind::ExpectedToken("\",\" or \")\" in parameter list".into(), "b".into())
        );
        assert_eq!(
            parse_err("function f(a: Text) { return a }"),
            ErrorKind::UnknownType("Text".into())
        );
    }

    #[test]
    fn test_unterminated_body() {
        assert!(matches!(
            parse_err("function f() { var x = 1"),
            ErrorKind::ExpectedToken(_, got) if got == "end of input"
        ));
    }

    #[test]
    fn test_import_requires_string() {
        assert_eq!(parse_err("import IO"), ErrorKind::ExpectedString("IO".into()));
    }

    #[test]
    fn test_unknown_module() {
        assert_eq!(parse_err("import \"Nope\""), ErrorKind::ModuleNotFound("Nope".into()));
        assert_eq!(
            parse_err("import \"missing.mrk\""),
            ErrorKind::ModuleNotFound("missing.mrk".into())
        );
    }

    #[test]
    fn test_stray_tokens_are_reported() {
        let err = parse("var x = 1\n)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedToken(")".into()));
        assert_eq!(err.span.map(|s| s.line), Some(2));
    }

    #[test]
    fn test_reserved_names() {
        assert_eq!(parse_err("var return = 1"), ErrorKind::ReservedWord("return".into()));
    }
}
