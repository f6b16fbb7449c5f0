// ==========================================
// 集成测试辅助模块
// ==========================================

pub mod integrity_test_helper;
