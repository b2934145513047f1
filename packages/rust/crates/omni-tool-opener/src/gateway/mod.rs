//! Gateway namespace: HTTP entrypoint.

mod http;

pub use http::{
    ErrorResponse, GatewayHealthResponse, GatewayState, OPEN_TOOL_STATUS, OpenToolRequest,
    OpenToolResponse, ResolvedOpenTool, router, run_http, validate_open_tool_request,
};
