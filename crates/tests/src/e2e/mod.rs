mod helpers;
mod report_flow_tests;
