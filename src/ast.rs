/// AST 的根节点, 代表一条完整的过滤查询
/// 相邻的过滤条件之间隐含 AND 关系
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
}

/// 单个过滤条件, 例如：`severity_text='error'`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: Field,
    pub op: CompOp,
    pub value: Literal,
}

/// 字段引用：基础列名 + 可选的嵌套属性路径
///
/// 带子段的字段表示对 Map 类型列的属性提取, 基础列名即属性列
/// (按惯例属性列名为 `p`), 子段用 '.' 连接后作为属性路径绑定参数
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub base: Identifier,
    pub path: Vec<Identifier>,
}

impl Field {
    /// 普通列引用
    pub fn column(base: impl Into<String>) -> Self {
        Self { base: Identifier(base.into()), path: Vec::new() }
    }

    /// 嵌套属性引用
    pub fn nested(base: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            base: Identifier(base.into()),
            path: path.into_iter().map(Identifier).collect(),
        }
    }

    pub fn is_nested(&self) -> bool {
        !self.path.is_empty()
    }

    /// 子段用 '.' 连接形成的属性路径
    pub fn attribute_path(&self) -> String {
        self.path
            .iter()
            .map(|segment| segment.0.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,      // =
    NotEq,   // !=
    Like,    // ~
    NotLike, // !~
    Gt,      // >
    Lt,      // <
    Gte,     // >=
    Lte,     // <=
}

impl CompOp {
    /// 对应的 SQL 运算符文本
    pub fn as_sql(self) -> &'static str {
        match self {
            CompOp::Eq => "=",
            CompOp::NotEq => "!=",
            CompOp::Like => "ILIKE",
            CompOp::NotLike => "NOT ILIKE",
            CompOp::Gt => ">",
            CompOp::Lt => "<",
            CompOp::Gte => ">=",
            CompOp::Lte => "<=",
        }
    }
}

/// 字面量值
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    /// 例如："-1h", 数值与单位由编译器解析
    RelativeTime(String),
}
