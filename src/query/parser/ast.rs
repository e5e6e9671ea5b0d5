// Procedure Abstract Syntax Tree (AST)
//
// This module defines the AST nodes for parsed procedure bodies. The node sets
// are closed: the planner matches on every variant.

use crate::common::types::DataType;
use crate::query::value::Value;

/// Represents a procedure statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `$name type;`
    Declaration { variable: String, data_type: DataType },
    /// `$name := expr;` or `$name[i] := expr;`
    Assignment { target: AssignTarget, value: Expression },
    /// A call whose results are optionally bound to receivers.
    /// A `None` receiver discards that position.
    Call {
        receivers: Vec<Option<String>>,
        call: FunctionCall,
    },
    /// `for $receiver in <term> { ... }`
    ForLoop {
        receiver: String,
        term: LoopTerm,
        body: Vec<Statement>,
    },
    /// `if cond { } elseif cond { } else { }`
    If {
        branches: Vec<IfBranch>,
        else_body: Option<Vec<Statement>>,
    },
    /// Embedded SQL executed for its side effects
    Sql(SqlStatement),
    Break,
    /// Skips the rest of the loop body and moves to the next iteration
    Continue,
    /// `return a, b;` ends the procedure. An empty list emits no row.
    Return { values: Vec<Expression> },
    /// `return select ...;` streams every row of the query and ends the procedure
    ReturnQuery(SqlStatement),
    /// `return next a, b;` emits a row and keeps going
    ReturnNext { values: Vec<Expression> },
}

/// Left-hand side of an assignment
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Variable(String),
    ArrayElement { variable: String, index: Expression },
}

/// Condition and body of one `if` or `elseif` branch
#[derive(Debug, Clone, PartialEq)]
pub struct IfBranch {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

/// The source a `for` loop iterates over
#[derive(Debug, Clone, PartialEq)]
pub enum LoopTerm {
    /// Inclusive integer range `start..end`
    Range { start: Expression, end: Expression },
    /// Elements of an array variable
    Variable(String),
    /// Rows of a query, bound as records
    Sql(SqlStatement),
    /// Rows returned by a procedure, bound as records named by its return fields
    Call(FunctionCall),
}

/// SQL text plus the procedure variables it references
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub parameters: Vec<String>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, parameters: Vec<&str>) -> Self {
        Self {
            sql: sql.into(),
            parameters: parameters.into_iter().map(String::from).collect(),
        }
    }
}

/// A call to a built-in or to another procedure
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expression>,
}

/// Comparison operators as written in source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
    Plus,
}

/// Represents a procedure expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Variable(String),
    ArrayAccess {
        array: Box<Expression>,
        index: Box<Expression>,
    },
    /// `arr[from:to]`; either bound may be omitted
    ArraySlice {
        array: Box<Expression>,
        from: Option<Box<Expression>>,
        to: Option<Box<Expression>>,
    },
    MakeArray(Vec<Expression>),
    FieldAccess {
        record: Box<Expression>,
        field: String,
    },
    FunctionCall(FunctionCall),
    Parenthesized(Box<Expression>),
    Comparison {
        left: Box<Expression>,
        op: ComparisonOperator,
        right: Box<Expression>,
    },
    Logical {
        left: Box<Expression>,
        op: LogicalOperator,
        right: Box<Expression>,
    },
    Arithmetic {
        left: Box<Expression>,
        op: ArithmeticOperator,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    /// `left IS [NOT] [DISTINCT FROM] right`
    Is {
        left: Box<Expression>,
        right: Box<Expression>,
        not: bool,
        distinct: bool,
    },
    /// `expr::type`
    Cast {
        expr: Box<Expression>,
        data_type: DataType,
    },
}

// Builders used by hosts that assemble trees by hand

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn null() -> Self {
        Expression::Literal(Value::Null(DataType::NULL))
    }

    pub fn variable(name: &str) -> Self {
        Expression::Variable(name.to_string())
    }

    pub fn index(array: Expression, index: Expression) -> Self {
        Expression::ArrayAccess {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    pub fn slice(array: Expression, from: Option<Expression>, to: Option<Expression>) -> Self {
        Expression::ArraySlice {
            array: Box::new(array),
            from: from.map(Box::new),
            to: to.map(Box::new),
        }
    }

    pub fn field(record: Expression, field: &str) -> Self {
        Expression::FieldAccess {
            record: Box::new(record),
            field: field.to_string(),
        }
    }

    pub fn call(name: &str, args: Vec<Expression>) -> Self {
        Expression::FunctionCall(FunctionCall {
            name: name.to_string(),
            args,
        })
    }

    pub fn compare(left: Expression, op: ComparisonOperator, right: Expression) -> Self {
        Expression::Comparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn logical(left: Expression, op: LogicalOperator, right: Expression) -> Self {
        Expression::Logical {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn arithmetic(left: Expression, op: ArithmeticOperator, right: Expression) -> Self {
        Expression::Arithmetic {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, expr: Expression) -> Self {
        Expression::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn is(left: Expression, right: Expression, not: bool, distinct: bool) -> Self {
        Expression::Is {
            left: Box::new(left),
            right: Box::new(right),
            not,
            distinct,
        }
    }

    pub fn cast(expr: Expression, data_type: DataType) -> Self {
        Expression::Cast {
            expr: Box::new(expr),
            data_type,
        }
    }
}

impl Statement {
    pub fn declare(variable: &str, data_type: DataType) -> Self {
        Statement::Declaration {
            variable: variable.to_string(),
            data_type,
        }
    }

    pub fn assign(variable: &str, value: Expression) -> Self {
        Statement::Assignment {
            target: AssignTarget::Variable(variable.to_string()),
            value,
        }
    }

    pub fn assign_index(variable: &str, index: Expression, value: Expression) -> Self {
        Statement::Assignment {
            target: AssignTarget::ArrayElement {
                variable: variable.to_string(),
                index,
            },
            value,
        }
    }

    pub fn call(receivers: Vec<Option<&str>>, name: &str, args: Vec<Expression>) -> Self {
        Statement::Call {
            receivers: receivers.into_iter().map(|r| r.map(String::from)).collect(),
            call: FunctionCall {
                name: name.to_string(),
                args,
            },
        }
    }

    pub fn for_range(receiver: &str, start: Expression, end: Expression, body: Vec<Statement>) -> Self {
        Statement::ForLoop {
            receiver: receiver.to_string(),
            term: LoopTerm::Range { start, end },
            body,
        }
    }

    pub fn for_array(receiver: &str, array: &str, body: Vec<Statement>) -> Self {
        Statement::ForLoop {
            receiver: receiver.to_string(),
            term: LoopTerm::Variable(array.to_string()),
            body,
        }
    }

    pub fn for_query(receiver: &str, query: SqlStatement, body: Vec<Statement>) -> Self {
        Statement::ForLoop {
            receiver: receiver.to_string(),
            term: LoopTerm::Sql(query),
            body,
        }
    }

    pub fn for_call(receiver: &str, name: &str, args: Vec<Expression>, body: Vec<Statement>) -> Self {
        Statement::ForLoop {
            receiver: receiver.to_string(),
            term: LoopTerm::Call(FunctionCall {
                name: name.to_string(),
                args,
            }),
            body,
        }
    }

    pub fn if_then(condition: Expression, body: Vec<Statement>) -> Self {
        Statement::If {
            branches: vec![IfBranch { condition, body }],
            else_body: None,
        }
    }

    pub fn if_else(condition: Expression, body: Vec<Statement>, else_body: Vec<Statement>) -> Self {
        Statement::If {
            branches: vec![IfBranch { condition, body }],
            else_body: Some(else_body),
        }
    }

    pub fn ret(values: Vec<Expression>) -> Self {
        Statement::Return { values }
    }

    pub fn ret_next(values: Vec<Expression>) -> Self {
        Statement::ReturnNext { values }
    }
}
