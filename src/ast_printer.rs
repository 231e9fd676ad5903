use crate::ast::{Expr, ExprKind, FunctionDecl, Program, Stmt, StmtKind};

/// Renders a program in parenthesised prefix form, one top-level statement
/// per line.  Used by `sharp parse` and by parser tests.
pub struct AstPrinter;

impl AstPrinter {
    pub fn program(program: &Program) -> String {
        program
            .statements
            .iter()
            .map(Self::stmt)
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn stmt(stmt: &Stmt) -> String {
        match &stmt.kind {
            StmtKind::Expression(expr) => format!("(; {})", Self::expr(expr)),

            StmtKind::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name, Self::expr(init)),
                None => format!("(var {})", name),
            },

            StmtKind::Return(value) => match value {
                Some(value) => format!("(return {})", Self::expr(value)),
                None => "(return)".into(),
            },

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::expr(condition),
                    Self::stmt(then_branch),
                    Self::stmt(else_branch)
                ),
                None => format!("(if {} {})", Self::expr(condition), Self::stmt(then_branch)),
            },

            StmtKind::While { condition, body } => {
                format!("(while {} {})", Self::expr(condition), Self::stmt(body))
            }

            // ── for: absent clauses print as `_` ────────────────────────
            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            } => format!(
                "(for {} {} {} {})",
                initializer.as_deref().map_or("_".into(), Self::stmt),
                condition.as_ref().map_or("_".into(), Self::expr),
                increment.as_ref().map_or("_".into(), Self::expr),
                Self::stmt(body)
            ),

            StmtKind::Block(statements) => Self::list("block", statements),

            StmtKind::Function(decl) => Self::function("function", decl),

            StmtKind::Class(decl) => {
                let head: &str = if decl.is_static { "static class" } else { "class" };
                let mut s = format!("({} {}", head, decl.name);

                for member in &decl.members {
                    s.push(' ');
                    s.push_str(&Self::stmt(member));
                }

                s.push(')');
                s
            }

            StmtKind::Property(decl) => {
                let visibility: &str = if decl.is_public { "public" } else { "private" };
                let mut s = format!("(property {}", visibility);

                if decl.is_static {
                    s.push_str(" static");
                }

                s.push(' ');
                s.push_str(&decl.name);

                if let Some(init) = &decl.initializer {
                    s.push(' ');
                    s.push_str(&Self::expr(init));
                }

                s.push(')');
                s
            }
        }
    }

    pub fn expr(expr: &Expr) -> String {
        match &expr.kind {
            // ── literals ────────────────────────────────────────────────
            ExprKind::Number(n) => {
                if n.fract() == 0.0 {
                    // 3.0 → 3.0
                    format!("{:.1}", n)
                } else {
                    n.to_string()
                }
            }

            ExprKind::Str(s) => format!("\"{}\"", s),

            ExprKind::Bool(b) => b.to_string(),

            ExprKind::Null => "null".into(),

            ExprKind::Identifier(name) => name.clone(),

            // ── operators ───────────────────────────────────────────────
            ExprKind::Unary { op, operand } => format!("({} {})", op.symbol(), Self::expr(operand)),

            ExprKind::Binary { left, op, right } => format!(
                "({} {} {})",
                op.symbol(),
                Self::expr(left),
                Self::expr(right)
            ),

            ExprKind::Assign { target, op, value } => format!(
                "({} {} {})",
                op.symbol(),
                Self::expr(target),
                Self::expr(value)
            ),

            ExprKind::Member { object, name } => format!("(. {} {})", Self::expr(object), name),

            ExprKind::Call { callee, args } => {
                let mut s = format!("(call {}", Self::expr(callee));
                for arg in args {
                    s.push(' ');
                    s.push_str(&Self::expr(arg));
                }
                s.push(')');
                s
            }
        }
    }

    fn function(head: &str, decl: &FunctionDecl) -> String {
        let mut s = format!("({} {} ({})", head, decl.name, decl.params.join(" "));

        for stmt in decl.body.iter() {
            s.push(' ');
            s.push_str(&Self::stmt(stmt));
        }

        s.push(')');
        s
    }

    fn list(head: &str, statements: &[Stmt]) -> String {
        let mut s = format!("({}", head);

        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::stmt(stmt));
        }

        s.push(')');
        s
    }
}
