// Core domain entities and shared types
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod app_config;

pub type Timestamp = DateTime<Utc>;

/// 枚举字段解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityParseError {
    #[error("无法识别的交易方向: {0}")]
    UnknownDirection(String),

    #[error("无法识别的交易状态: {0}")]
    UnknownStatus(String),

    #[error("无法识别的预警方向: {0}")]
    UnknownWarningDirection(String),
}

/// 交易方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeDirection {
    /// 做多
    OpenLong,
    /// 做空
    OpenShort,
    /// 多头平仓
    CloseLong,
    /// 空头平仓
    CloseShort,
}

impl TradeDirection {
    /// 存储用的英文代码
    pub fn code(&self) -> &'static str {
        match self {
            TradeDirection::OpenLong => "OPEN_LONG",
            TradeDirection::OpenShort => "OPEN_SHORT",
            TradeDirection::CloseLong => "CLOSE_LONG",
            TradeDirection::CloseShort => "CLOSE_SHORT",
        }
    }

    /// 界面显示的中文标签
    pub fn label(&self) -> &'static str {
        match self {
            TradeDirection::OpenLong => "做多",
            TradeDirection::OpenShort => "做空",
            TradeDirection::CloseLong => "多头平仓",
            TradeDirection::CloseShort => "空头平仓",
        }
    }

    /// 是否增加净多头敞口（做多、空头平仓）
    pub fn adds_exposure(&self) -> bool {
        matches!(self, TradeDirection::OpenLong | TradeDirection::CloseShort)
    }
}

impl Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for TradeDirection {
    type Err = EntityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "OPEN_LONG" | "做多" => Ok(TradeDirection::OpenLong),
            "OPEN_SHORT" | "做空" => Ok(TradeDirection::OpenShort),
            "CLOSE_LONG" | "多头平仓" => Ok(TradeDirection::CloseLong),
            "CLOSE_SHORT" | "空头平仓" => Ok(TradeDirection::CloseShort),
            other => Err(EntityParseError::UnknownDirection(other.to_string())),
        }
    }
}

/// 交易状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// 计划中
    Planned,
    /// 已执行
    Executed,
}

impl TransactionStatus {
    pub fn code(&self) -> &'static str {
        match self {
            TransactionStatus::Planned => "PLANNED",
            TransactionStatus::Executed => "EXECUTED",
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Planned => write!(f, "计划"),
            TransactionStatus::Executed => write!(f, "已执行"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = EntityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PLANNED" | "计划" => Ok(TransactionStatus::Planned),
            "EXECUTED" | "已执行" => Ok(TransactionStatus::Executed),
            other => Err(EntityParseError::UnknownStatus(other.to_string())),
        }
    }
}

/// 预警方向：触发价在现价之上还是之下
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningDirection {
    /// 向上
    #[default]
    Above,
    /// 向下
    Below,
}

impl WarningDirection {
    pub fn code(&self) -> &'static str {
        match self {
            WarningDirection::Above => "ABOVE",
            WarningDirection::Below => "BELOW",
        }
    }

    /// 距离计算的符号，向下为 -1
    pub fn sign(&self) -> Decimal {
        match self {
            WarningDirection::Above => Decimal::ONE,
            WarningDirection::Below => Decimal::NEGATIVE_ONE,
        }
    }
}

impl Display for WarningDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningDirection::Above => write!(f, "向上"),
            WarningDirection::Below => write!(f, "向下"),
        }
    }
}

impl FromStr for WarningDirection {
    type Err = EntityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ABOVE" | "向上" => Ok(WarningDirection::Above),
            "BELOW" | "向下" => Ok(WarningDirection::Below),
            other => Err(EntityParseError::UnknownWarningDirection(other.to_string())),
        }
    }
}

/// 计划交易中可编辑的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableField {
    WarningDirection,
    DistancePercent,
    TriggerPrice,
    Shares,
    AllocationPercent,
    CashAmount,
}

impl EditableField {
    pub fn code(&self) -> &'static str {
        match self {
            EditableField::WarningDirection => "warning_direction",
            EditableField::DistancePercent => "distance_percent",
            EditableField::TriggerPrice => "trigger_price",
            EditableField::Shares => "shares",
            EditableField::AllocationPercent => "allocation_percent",
            EditableField::CashAmount => "cash_amount",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "warning_direction" => Some(EditableField::WarningDirection),
            "distance_percent" => Some(EditableField::DistancePercent),
            "trigger_price" => Some(EditableField::TriggerPrice),
            "shares" => Some(EditableField::Shares),
            "allocation_percent" => Some(EditableField::AllocationPercent),
            "cash_amount" => Some(EditableField::CashAmount),
            _ => None,
        }
    }
}

/// 单字段编辑，携带新值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEdit {
    WarningDirection(WarningDirection),
    DistancePercent(Decimal),
    TriggerPrice(Decimal),
    Shares(u64),
    AllocationPercent(Decimal),
    CashAmount(Decimal),
}

impl FieldEdit {
    /// 被编辑的字段
    pub fn field(&self) -> EditableField {
        match self {
            FieldEdit::WarningDirection(_) => EditableField::WarningDirection,
            FieldEdit::DistancePercent(_) => EditableField::DistancePercent,
            FieldEdit::TriggerPrice(_) => EditableField::TriggerPrice,
            FieldEdit::Shares(_) => EditableField::Shares,
            FieldEdit::AllocationPercent(_) => EditableField::AllocationPercent,
            FieldEdit::CashAmount(_) => EditableField::CashAmount,
        }
    }
}

/// 计划交易（尚未执行的交易指令）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlannedTrade {
    /// 触发价
    pub trigger_price: Decimal,
    /// 预警方向
    pub warning_direction: WarningDirection,
    /// 距离（百分比）
    pub distance_percent: Decimal,
    /// 股数
    pub shares: u64,
    /// 金额
    pub cash_amount: Decimal,
    /// 仓位占比（百分比）
    pub allocation_percent: Decimal,
    /// 最近一次编辑的字段
    pub last_edited: Option<EditableField>,
}

/// 交易记录
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// 交易ID
    pub transaction_id: Arc<str>,
    /// 所属项目ID
    pub project_id: Arc<str>,
    /// 交易方向
    pub direction: TradeDirection,
    /// 交易状态
    pub status: TransactionStatus,
    /// 股数
    pub shares: u64,
    /// 成交金额（股数 × 成交价）
    pub cash_amount: Decimal,
    /// 触发价
    pub trigger_price: Decimal,
    /// 预警方向
    pub warning_direction: WarningDirection,
    /// 距离（百分比）
    pub distance_percent: Decimal,
    /// 仓位占比（百分比）
    pub allocation_percent: Decimal,
    /// 最近一次编辑的字段
    pub last_edited: Option<EditableField>,
    /// 创建时间
    pub created_at: Timestamp,
    /// 执行时间
    pub executed_at: Option<Timestamp>,
}

impl Transaction {
    /// 创建已执行的交易
    pub fn new_executed(
        transaction_id: String,
        project_id: String,
        direction: TradeDirection,
        shares: u64,
        cash_amount: Decimal,
        executed_at: Timestamp,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            project_id: project_id.into(),
            direction,
            status: TransactionStatus::Executed,
            shares,
            cash_amount,
            trigger_price: Decimal::ZERO,
            warning_direction: WarningDirection::default(),
            distance_percent: Decimal::ZERO,
            allocation_percent: Decimal::ZERO,
            last_edited: None,
            created_at: executed_at,
            executed_at: Some(executed_at),
        }
    }

    /// 创建计划交易
    pub fn new_planned(
        transaction_id: String,
        project_id: String,
        direction: TradeDirection,
        plan: PlannedTrade,
        created_at: Timestamp,
    ) -> Self {
        let mut transaction = Self {
            transaction_id: transaction_id.into(),
            project_id: project_id.into(),
            direction,
            status: TransactionStatus::Planned,
            shares: 0,
            cash_amount: Decimal::ZERO,
            trigger_price: Decimal::ZERO,
            warning_direction: WarningDirection::default(),
            distance_percent: Decimal::ZERO,
            allocation_percent: Decimal::ZERO,
            last_edited: None,
            created_at,
            executed_at: None,
        };
        transaction.apply_planned_trade(&plan);
        transaction
    }

    pub fn is_executed(&self) -> bool {
        self.status == TransactionStatus::Executed
    }

    pub fn is_planned(&self) -> bool {
        self.status == TransactionStatus::Planned
    }

    /// 取出计划交易视图
    pub fn planned_trade(&self) -> PlannedTrade {
        PlannedTrade {
            trigger_price: self.trigger_price,
            warning_direction: self.warning_direction,
            distance_percent: self.distance_percent,
            shares: self.shares,
            cash_amount: self.cash_amount,
            allocation_percent: self.allocation_percent,
            last_edited: self.last_edited,
        }
    }

    /// 写回计划交易视图
    pub fn apply_planned_trade(&mut self, plan: &PlannedTrade) {
        self.trigger_price = plan.trigger_price;
        self.warning_direction = plan.warning_direction;
        self.distance_percent = plan.distance_percent;
        self.shares = plan.shares;
        self.cash_amount = plan.cash_amount;
        self.allocation_percent = plan.allocation_percent;
        self.last_edited = plan.last_edited;
    }
}

/// 持仓衍生指标，整体重算，不做增量修补
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// 净持股数（可为负，表示净空头）
    pub share_count: i64,
    /// 累计成本
    pub cost_basis_total: Decimal,
    /// 每股成本
    pub cost_basis_per_share: Decimal,
    /// 市值
    pub market_value: Decimal,
    /// 盈亏金额
    pub profit_loss_amount: Decimal,
    /// 盈亏比例（相对成本）
    pub profit_loss_percent: Decimal,
    /// 仓位占比（相对总资金）
    pub allocation_percent: Decimal,
    /// 盈亏占总资金比例
    pub capital_profit_loss_percent: Decimal,
}

/// 投资项目（手动跟踪的个股持仓）
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// 项目ID
    pub project_id: Arc<str>,
    /// 项目名称
    pub name: Arc<str>,
    /// 股票代码
    pub symbol: Arc<str>,
    /// 现价
    pub current_price: Decimal,
    /// 衍生持仓指标
    pub position: Position,
    /// 排序序号
    pub sort_order: i64,
    /// 创建时间
    pub created_at: Timestamp,
    /// 更新时间
    pub updated_at: Timestamp,
}

impl Project {
    pub fn new(
        project_id: String,
        name: String,
        symbol: String,
        current_price: Decimal,
        sort_order: i64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            symbol: symbol.into(),
            current_price,
            position: Position::default(),
            sort_order,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

/// 基金持仓
#[derive(Debug, Clone, PartialEq)]
pub struct FundHolding {
    /// 基金记录ID
    pub fund_id: Arc<str>,
    /// 基金名称
    pub name: Arc<str>,
    /// 基金代码
    pub code: Arc<str>,
    /// 持有份额
    pub units: Decimal,
    /// 投入成本
    pub cost_amount: Decimal,
    /// 最新单位净值
    pub nav: Decimal,
    /// 创建时间
    pub created_at: Timestamp,
    /// 更新时间
    pub updated_at: Timestamp,
}

impl FundHolding {
    pub fn new(
        fund_id: String,
        name: String,
        code: String,
        units: Decimal,
        cost_amount: Decimal,
        nav: Decimal,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            fund_id: fund_id.into(),
            name: name.into(),
            code: code.into(),
            units,
            cost_amount,
            nav,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}
