//! Shared parser implementation for Turtle and TriG.

use crate::error::TurtleSyntaxError;
use crate::lexer::{Lexer, LexerMode, Punct, Token, TokenKind};
use crate::relaxations::{TurtleRelaxation, TurtleRelaxations};
use elkiri::Iri;
use elkrdf::vocab::{rdf, xsd};
use elkrdf::{BlankNode, GraphName, Literal, NamedNode, NamedOrBlankNode, NamespaceMap, Quad, Term};
use std::collections::HashMap;

pub(crate) struct ParserConfig {
    pub base: Option<Iri>,
    pub prefixes: Vec<(String, String)>,
    pub relaxations: TurtleRelaxations,
    pub with_graph_name: bool,
}

/// A single-use recursive-descent parser producing quads.
///
/// Blank node labels are scoped to the parsed document: each label is mapped
/// to a fresh [`BlankNode`], so labels from two parses never collide.
pub(crate) struct TerseParser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    relaxations: TurtleRelaxations,
    with_graph_name: bool,
    prefixes: HashMap<String, String>,
    base: Option<Iri>,
    bnode_labels: HashMap<String, BlankNode>,
    quads: Vec<Quad>,
    cur_graph: GraphName,
}

impl<'a> TerseParser<'a> {
    pub fn new(input: &'a str, config: ParserConfig) -> Self {
        Self {
            lexer: Lexer::new(input, LexerMode::Terse, config.relaxations),
            peeked: None,
            relaxations: config.relaxations,
            with_graph_name: config.with_graph_name,
            prefixes: config.prefixes.into_iter().collect(),
            base: config.base,
            bnode_labels: HashMap::new(),
            quads: Vec::new(),
            cur_graph: GraphName::DefaultGraph,
        }
    }

    pub fn parse(mut self) -> Result<Vec<Quad>, TurtleSyntaxError> {
        while !matches!(self.peek()?.kind, TokenKind::Eof) {
            self.statement_or_directive()?;
        }
        Ok(self.quads)
    }

    fn peek(&mut self) -> Result<&Token, TurtleSyntaxError> {
        if self.peeked.is_none() {
            let token = self.lexer.next_token()?;
            return Ok(self.peeked.insert(token));
        }
        match &self.peeked {
            Some(token) => Ok(token),
            None => unreachable!("just filled above"),
        }
    }

    fn next(&mut self) -> Result<Token, TurtleSyntaxError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    fn statement_or_directive(&mut self) -> Result<(), TurtleSyntaxError> {
        let token = self.peek()?.clone();
        match &token.kind {
            TokenKind::LangTag(word) if word.eq_ignore_ascii_case("prefix") => {
                self.check_directive_case(word, "@prefix", &token)?;
                self.next()?;
                self.prefix_directive()
            }
            TokenKind::LangTag(word) if word.eq_ignore_ascii_case("base") => {
                self.check_directive_case(word, "@base", &token)?;
                self.next()?;
                self.base_directive()
            }
            TokenKind::Keyword(word) if word.eq_ignore_ascii_case("prefix") => {
                self.check_sparql_directive(&token)?;
                self.next()?;
                self.prefix_directive()
            }
            TokenKind::Keyword(word) if word.eq_ignore_ascii_case("base") => {
                self.check_sparql_directive(&token)?;
                self.next()?;
                self.base_directive()
            }
            TokenKind::Keyword(word)
                if self.with_graph_name && word.eq_ignore_ascii_case("graph") =>
            {
                self.next()?;
                let label = self.next()?;
                let name = self.label_term(label)?;
                let open = self.next()?;
                if !matches!(open.kind, TokenKind::Punct(Punct::BraceOpen)) {
                    return Err(self.unexpected(&open, "'{' is expected after the graph name"));
                }
                self.graph_block(name.into())
            }
            TokenKind::Punct(Punct::BraceOpen) if self.with_graph_name => {
                self.next()?;
                self.graph_block(GraphName::DefaultGraph)
            }
            _ => self.triples(false),
        }
    }

    /// The `@PREFIX` and `@BASE` spellings are only admitted alongside the
    /// SPARQL-style directives.
    fn check_directive_case(
        &self,
        word: &str,
        lowercase: &str,
        token: &Token,
    ) -> Result<(), TurtleSyntaxError> {
        if format!("@{word}") == lowercase
            || self
                .relaxations
                .contains(TurtleRelaxation::PrefixWithoutAtSign)
        {
            Ok(())
        } else {
            Err(TurtleSyntaxError::new(
                format!("'@{word}' must be written '{lowercase}' in strict mode"),
                token.position,
            ))
        }
    }

    fn check_sparql_directive(&self, token: &Token) -> Result<(), TurtleSyntaxError> {
        if self
            .relaxations
            .contains(TurtleRelaxation::PrefixWithoutAtSign)
        {
            Ok(())
        } else {
            Err(self.unexpected(
                token,
                "not a valid statement; directives without '@' are rejected in strict mode",
            ))
        }
    }

    fn prefix_directive(&mut self) -> Result<(), TurtleSyntaxError> {
        let token = self.next()?;
        let prefix = match token.kind {
            TokenKind::PrefixedName { prefix, local } if local.is_empty() => prefix,
            _ => {
                return Err(
                    self.unexpected(&token, "a prefix like 'ex:' is expected after @prefix")
                )
            }
        };
        let iri_token = self.next()?;
        if let TokenKind::IriRef(ref iri) = iri_token.kind {
            let namespace = self.resolve_iri(iri.clone(), &iri_token)?;
            self.prefixes.insert(prefix, namespace.into_string());
        } else {
            return Err(self.unexpected(
                &iri_token,
                "the namespace IRI is expected after the prefix name",
            ));
        }
        self.directive_dot()
    }

    fn base_directive(&mut self) -> Result<(), TurtleSyntaxError> {
        let token = self.next()?;
        if let TokenKind::IriRef(iri) = token.kind {
            let resolved = match &self.base {
                Some(base) => base
                    .resolve(&iri)
                    .map_err(|e| TurtleSyntaxError::new(e.to_string(), token.position))?,
                None => Iri::parse(iri)
                    .map_err(|e| TurtleSyntaxError::new(e.to_string(), token.position))?,
            };
            self.base = Some(resolved);
        } else {
            return Err(self.unexpected(&token, "an IRI is expected after @base"));
        }
        self.directive_dot()
    }

    fn directive_dot(&mut self) -> Result<(), TurtleSyntaxError> {
        if matches!(self.peek()?.kind, TokenKind::Punct(Punct::Dot)) {
            self.next()?;
            Ok(())
        } else if self
            .relaxations
            .contains(TurtleRelaxation::MissingDotAfterPrefix)
        {
            Ok(())
        } else {
            let token = self.peek()?.clone();
            Err(self.unexpected(&token, "'.' is expected at the end of the directive"))
        }
    }

    fn triples(&mut self, in_block: bool) -> Result<(), TurtleSyntaxError> {
        let token = self.peek()?.clone();
        match token.kind {
            TokenKind::Punct(Punct::BracketOpen) => {
                self.next()?;
                let subject = self.blank_node_property_list(&token)?;
                if !matches!(
                    self.peek()?.kind,
                    TokenKind::Punct(Punct::Dot | Punct::BraceClose)
                ) {
                    self.predicate_object_list(&subject.clone().into())?;
                }
                self.statement_end(in_block)
            }
            TokenKind::Punct(Punct::ParenOpen) => {
                self.next()?;
                let head = self.collection(&token)?;
                let subject = match head {
                    Term::NamedNode(node) => NamedOrBlankNode::from(node),
                    Term::BlankNode(node) => NamedOrBlankNode::from(node),
                    Term::Literal(_) => unreachable!("collections start with a node"),
                };
                self.predicate_object_list(&subject)?;
                self.statement_end(in_block)
            }
            _ => {
                let label = self.next()?;
                let subject = self.label_term(label)?;
                if self.with_graph_name
                    && !in_block
                    && matches!(self.peek()?.kind, TokenKind::Punct(Punct::BraceOpen))
                {
                    self.next()?;
                    return self.graph_block(subject.into());
                }
                self.predicate_object_list(&subject)?;
                self.statement_end(in_block)
            }
        }
    }

    /// A term allowed both as a subject and as a TriG graph label.
    fn label_term(&mut self, token: Token) -> Result<NamedOrBlankNode, TurtleSyntaxError> {
        match token.kind {
            TokenKind::IriRef(ref iri) => Ok(self.resolve_iri(iri.clone(), &token)?.into()),
            TokenKind::PrefixedName {
                ref prefix,
                ref local,
            } => Ok(self
                .expand_prefixed_name(prefix.clone(), local, &token)?
                .into()),
            TokenKind::BlankNodeLabel(ref label) => Ok(self.labeled_bnode(label).into()),
            TokenKind::Keyword(ref word)
                if self
                    .relaxations
                    .contains(TurtleRelaxation::IdentifiersWithoutColon) =>
            {
                Ok(self.resolve_identifier(word.clone(), &token)?.into())
            }
            _ => Err(self.unexpected(&token, "not a valid subject or graph name")),
        }
    }

    fn graph_block(&mut self, name: GraphName) -> Result<(), TurtleSyntaxError> {
        self.cur_graph = name;
        loop {
            let token = self.peek()?.clone();
            match token.kind {
                TokenKind::Punct(Punct::BraceClose) => {
                    self.next()?;
                    break;
                }
                TokenKind::Eof => {
                    return Err(self.unexpected(&token, "'}' is expected to close the graph"))
                }
                _ => self.triples(true)?,
            }
        }
        self.cur_graph = GraphName::DefaultGraph;
        Ok(())
    }

    fn statement_end(&mut self, in_block: bool) -> Result<(), TurtleSyntaxError> {
        let token = self.peek()?.clone();
        match token.kind {
            TokenKind::Punct(Punct::Dot) => {
                self.next()?;
                Ok(())
            }
            // Inside a TriG graph the closing brace also ends the last statement.
            TokenKind::Punct(Punct::BraceClose) if in_block => Ok(()),
            TokenKind::Eof
                if !in_block
                    && self
                        .relaxations
                        .contains(TurtleRelaxation::MissingFinalDot) =>
            {
                Ok(())
            }
            _ => Err(self.unexpected(&token, "'.' is expected at the end of the statement")),
        }
    }

    fn predicate_object_list(
        &mut self,
        subject: &NamedOrBlankNode,
    ) -> Result<(), TurtleSyntaxError> {
        loop {
            let predicate = self.verb()?;
            loop {
                let object = self.object()?;
                self.quads.push(Quad::new(
                    subject.clone(),
                    predicate.clone(),
                    object,
                    self.cur_graph.clone(),
                ));
                if matches!(self.peek()?.kind, TokenKind::Punct(Punct::Comma)) {
                    self.next()?;
                } else {
                    break;
                }
            }
            let mut saw_semicolon = false;
            while matches!(self.peek()?.kind, TokenKind::Punct(Punct::Semicolon)) {
                self.next()?;
                saw_semicolon = true;
            }
            let continues = saw_semicolon
                && matches!(
                    self.peek()?.kind,
                    TokenKind::IriRef(_) | TokenKind::PrefixedName { .. } | TokenKind::Keyword(_)
                );
            if !continues {
                return Ok(());
            }
        }
    }

    fn verb(&mut self) -> Result<NamedNode, TurtleSyntaxError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Keyword(ref word) if word == "a" => Ok(rdf::TYPE.into_owned()),
            TokenKind::IriRef(ref iri) => self.resolve_iri(iri.clone(), &token),
            TokenKind::PrefixedName {
                ref prefix,
                ref local,
            } => self.expand_prefixed_name(prefix.clone(), local, &token),
            TokenKind::Keyword(ref word)
                if self
                    .relaxations
                    .contains(TurtleRelaxation::IdentifiersWithoutColon) =>
            {
                self.resolve_identifier(word.clone(), &token)
            }
            _ => Err(self.unexpected(&token, "not a valid predicate")),
        }
    }

    fn object(&mut self) -> Result<Term, TurtleSyntaxError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::IriRef(ref iri) => Ok(self.resolve_iri(iri.clone(), &token)?.into()),
            TokenKind::PrefixedName {
                ref prefix,
                ref local,
            } => Ok(self
                .expand_prefixed_name(prefix.clone(), local, &token)?
                .into()),
            TokenKind::BlankNodeLabel(ref label) => Ok(self.labeled_bnode(label).into()),
            TokenKind::Punct(Punct::BracketOpen) => {
                Ok(self.blank_node_property_list(&token)?.into())
            }
            TokenKind::Punct(Punct::ParenOpen) => self.collection(&token),
            TokenKind::StringLiteral(value) => self.literal_suffix(value),
            TokenKind::Integer(value) => Ok(Literal::new_typed(value, xsd::INTEGER).into()),
            TokenKind::Decimal(value) => Ok(Literal::new_typed(value, xsd::DECIMAL).into()),
            TokenKind::Double(value) => Ok(Literal::new_typed(value, xsd::DOUBLE).into()),
            TokenKind::Keyword(ref word) if word == "true" || word == "false" => {
                Ok(Literal::new_typed(word.clone(), xsd::BOOLEAN).into())
            }
            TokenKind::Keyword(ref word)
                if self
                    .relaxations
                    .contains(TurtleRelaxation::IdentifiersWithoutColon) =>
            {
                Ok(self.resolve_identifier(word.clone(), &token)?.into())
            }
            _ => Err(self.unexpected(&token, "not a valid object")),
        }
    }

    fn literal_suffix(&mut self, value: String) -> Result<Term, TurtleSyntaxError> {
        let token = self.peek()?.clone();
        match token.kind {
            TokenKind::LangTag(ref tag) => {
                self.next()?;
                Ok(Literal::new_language_tagged(value, tag.clone())
                    .map_err(|e| TurtleSyntaxError::new(e.to_string(), token.position))?
                    .into())
            }
            TokenKind::Punct(Punct::DatatypeMarker) => {
                self.next()?;
                let dt_token = self.next()?;
                let datatype = match dt_token.kind {
                    TokenKind::IriRef(ref iri) => self.resolve_iri(iri.clone(), &dt_token)?,
                    TokenKind::PrefixedName {
                        ref prefix,
                        ref local,
                    } => self.expand_prefixed_name(prefix.clone(), local, &dt_token)?,
                    _ => {
                        return Err(
                            self.unexpected(&dt_token, "a datatype IRI is expected after '^^'")
                        )
                    }
                };
                Ok(Literal::new_typed(value, datatype).into())
            }
            _ => Ok(Literal::from(value).into()),
        }
    }

    /// Parses the inside of `[ … ]`, the opening bracket being consumed.
    fn blank_node_property_list(
        &mut self,
        open: &Token,
    ) -> Result<BlankNode, TurtleSyntaxError> {
        let node = BlankNode::default();
        if matches!(self.peek()?.kind, TokenKind::Punct(Punct::BracketClose)) {
            self.next()?;
            return Ok(node);
        }
        self.predicate_object_list(&node.clone().into())?;
        let token = self.next()?;
        if matches!(token.kind, TokenKind::Punct(Punct::BracketClose)) {
            Ok(node)
        } else if matches!(token.kind, TokenKind::Eof) {
            Err(TurtleSyntaxError::new(
                "unterminated blank node, ']' is expected",
                open.position,
            ))
        } else {
            Err(self.unexpected(&token, "']' is expected to close the blank node"))
        }
    }

    /// Parses the items of `( … )` and expands the collection to its
    /// `rdf:first`/`rdf:rest` chain, returning the head (`rdf:nil` when
    /// empty).
    fn collection(&mut self, open: &Token) -> Result<Term, TurtleSyntaxError> {
        let mut items = Vec::new();
        loop {
            let token = self.peek()?.clone();
            match token.kind {
                TokenKind::Punct(Punct::ParenClose) => {
                    self.next()?;
                    break;
                }
                TokenKind::Eof => {
                    return Err(TurtleSyntaxError::new(
                        "unterminated collection, ')' is expected",
                        open.position,
                    ))
                }
                _ => items.push(self.object()?),
            }
        }
        if items.is_empty() {
            return Ok(rdf::NIL.into_owned().into());
        }
        let nodes: Vec<BlankNode> = items.iter().map(|_| BlankNode::default()).collect();
        for (i, item) in items.into_iter().enumerate() {
            self.quads.push(Quad::new(
                nodes[i].clone(),
                rdf::FIRST.into_owned(),
                item,
                self.cur_graph.clone(),
            ));
            let rest: Term = match nodes.get(i + 1) {
                Some(next) => next.clone().into(),
                None => rdf::NIL.into_owned().into(),
            };
            self.quads.push(Quad::new(
                nodes[i].clone(),
                rdf::REST.into_owned(),
                rest,
                self.cur_graph.clone(),
            ));
        }
        Ok(nodes[0].clone().into())
    }

    fn labeled_bnode(&mut self, label: &str) -> BlankNode {
        self.bnode_labels
            .entry(label.to_owned())
            .or_default()
            .clone()
    }

    fn resolve_iri(&self, iri: String, token: &Token) -> Result<NamedNode, TurtleSyntaxError> {
        match &self.base {
            Some(base) => Ok(base
                .resolve(&iri)
                .map_err(|e| TurtleSyntaxError::new(e.to_string(), token.position))?
                .into()),
            None => match Iri::parse(iri.clone()) {
                Ok(iri) => Ok(iri.into()),
                Err(_) => Err(TurtleSyntaxError::new(
                    format!("the relative IRI reference <{iri}> cannot be resolved, no base IRI is set"),
                    token.position,
                )),
            },
        }
    }

    fn resolve_identifier(
        &self,
        word: String,
        token: &Token,
    ) -> Result<NamedNode, TurtleSyntaxError> {
        match &self.base {
            Some(base) => Ok(base
                .resolve(&word)
                .map_err(|e| TurtleSyntaxError::new(e.to_string(), token.position))?
                .into()),
            None => Err(TurtleSyntaxError::new(
                format!("the identifier '{word}' cannot be resolved, no base IRI is set"),
                token.position,
            )),
        }
    }

    fn expand_prefixed_name(
        &mut self,
        prefix: String,
        local: &str,
        token: &Token,
    ) -> Result<NamedNode, TurtleSyntaxError> {
        let namespace = match self.prefixes.get(&prefix) {
            Some(namespace) => namespace.clone(),
            None => {
                let well_known = if self
                    .relaxations
                    .contains(TurtleRelaxation::AutoAddCommonPrefixes)
                {
                    NamespaceMap::well_known(&prefix)
                } else {
                    None
                };
                match well_known {
                    Some(namespace) => {
                        self.prefixes.insert(prefix, namespace.to_owned());
                        namespace.to_owned()
                    }
                    None => {
                        return Err(TurtleSyntaxError::new(
                            format!("the prefix '{prefix}:' is not declared"),
                            token.position,
                        ))
                    }
                }
            }
        };
        Ok(NamedNode::new_unchecked(format!("{namespace}{local}")))
    }

    fn unexpected(&self, token: &Token, expectation: &str) -> TurtleSyntaxError {
        TurtleSyntaxError::new(
            format!("{}: {expectation}", describe(&token.kind)),
            token.position,
        )
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::IriRef(iri) => format!("IRI <{iri}>"),
        TokenKind::PrefixedName { prefix, local } => format!("'{prefix}:{local}'"),
        TokenKind::BlankNodeLabel(label) => format!("'_:{label}'"),
        TokenKind::StringLiteral(_) => "string literal".to_owned(),
        TokenKind::LangTag(tag) => format!("'@{tag}'"),
        TokenKind::Integer(value) | TokenKind::Decimal(value) | TokenKind::Double(value) => {
            format!("number '{value}'")
        }
        TokenKind::Keyword(word) => format!("'{word}'"),
        TokenKind::Punct(punct) => format!("'{}'", punct.as_str()),
        TokenKind::Eof => "end of file".to_owned(),
    }
}

impl Punct {
    fn as_str(self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::Semicolon => ";",
            Self::Comma => ",",
            Self::BracketOpen => "[",
            Self::BracketClose => "]",
            Self::ParenOpen => "(",
            Self::ParenClose => ")",
            Self::BraceOpen => "{",
            Self::BraceClose => "}",
            Self::DatatypeMarker => "^^",
        }
    }
}
