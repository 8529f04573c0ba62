//! 工具箱：注册表、执行器、强类型 schema 适配、演示工具

pub mod clarify;
pub mod echo;
pub mod executor;
pub mod registry;
pub mod schema;
pub mod travel;

pub use clarify::AskForClarificationTool;
pub use echo::EchoTool;
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolOutput, ToolRegistry};
pub use schema::{response_schema, tool_call_schema_json, Typed, TypedTool};
pub use travel::{AttractionSearchTool, FlightSearchTool, HotelSearchTool, WeatherTool};

/// 注册全部旅行演示工具与澄清工具
pub fn register_travel_tools(registry: &mut ToolRegistry) {
    registry.register(Typed(WeatherTool));
    registry.register(Typed(FlightSearchTool));
    registry.register(Typed(HotelSearchTool));
    registry.register(Typed(AttractionSearchTool));
    registry.register(AskForClarificationTool);
}
