//! Flow nodes, tasks and the collaborators that persist them

pub mod model;
pub mod services;

pub use model::{
    Comment, FlowNodeInstance, FlowNodeKind, GatewayInstance, GatewayType, HiddenTask, Session,
    StateCategory, User,
};
pub use services::{
    ActivityInstanceService, CommentService, ContractDataService, FlowNodeExecutor,
    FlowNodeInstanceService, GatewayInstanceService, IdentityService,
};
